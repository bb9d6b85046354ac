//! 面板布局管理：可拖拽的尺寸状态机加上一组纯枚举的开关状态。

use std::collections::BTreeMap;

use super::terminal::TerminalId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelSide {
    Left,
    Right,
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Resizing,
}

/// 单个可拖拽面板：`idle -> resizing -> idle`，低于 `min_size` 的值被拒绝（保持旧值）。
#[derive(Debug)]
pub struct ResizablePanel {
    pub key: &'static str,
    side: PanelSide,
    size: u16,
    initial_size: u16,
    min_size: u16,
    drag: DragState,
}

impl ResizablePanel {
    pub fn new(key: &'static str, side: PanelSide, initial_size: u16, min_size: u16) -> Self {
        Self {
            key,
            side,
            size: initial_size,
            initial_size,
            min_size,
            drag: DragState::Idle,
        }
    }

    pub fn size(&self) -> u16 {
        self.size
    }

    pub fn min_size(&self) -> u16 {
        self.min_size
    }

    pub fn is_resizing(&self) -> bool {
        self.drag == DragState::Resizing
    }

    /// 持久化来的尺寸：低于下限的一律忽略，退回初始值。
    pub fn restore(&mut self, persisted: Option<u16>) {
        self.size = match persisted {
            Some(size) if size >= self.min_size => size,
            _ => self.initial_size,
        };
    }

    pub fn begin_drag(&mut self) {
        self.drag = DragState::Resizing;
    }

    /// 指针位移换算到面板轴向上的新尺寸；非拖拽态忽略。
    pub fn drag_to(&mut self, x: u16, y: u16, viewport_w: u16, viewport_h: u16) -> bool {
        if self.drag != DragState::Resizing {
            return false;
        }
        let new_size = match self.side {
            PanelSide::Left => x,
            PanelSide::Right => viewport_w.saturating_sub(x),
            PanelSide::Top => y,
            PanelSide::Bottom => viewport_h.saturating_sub(y),
        };
        if new_size < self.min_size || new_size == self.size {
            return false;
        }
        self.size = new_size;
        true
    }

    pub fn end_drag(&mut self) -> bool {
        let was = self.drag == DragState::Resizing;
        self.drag = DragState::Idle;
        was
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeftPanelTab {
    Workspace,
    Learning,
    Notes,
}

impl LeftPanelTab {
    pub fn label(self) -> &'static str {
        match self {
            Self::Workspace => "Workspace",
            Self::Learning => "Learning Path",
            Self::Notes => "Notes",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RightPanelTab {
    Webview,
    Agent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BottomTab {
    Problems,
    Terminal(TerminalId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelId {
    Sidebar,
    RightPanel,
    BottomPanel,
}

#[derive(Debug)]
pub struct PanelLayout {
    pub sidebar: ResizablePanel,
    pub right_panel: ResizablePanel,
    pub bottom_panel: ResizablePanel,

    pub left_tab: LeftPanelTab,
    pub right_tab: Option<RightPanelTab>,
    pub bottom_visible: bool,
    pub bottom_tab: BottomTab,

    active_drag: Option<PanelId>,
    /// 拖拽期间抑制其他指针交互，松开或卸载时无条件恢复。
    suppress_interactions: bool,
}

impl Default for PanelLayout {
    fn default() -> Self {
        Self {
            sidebar: ResizablePanel::new("panel.sidebar", PanelSide::Left, 36, 20),
            right_panel: ResizablePanel::new("panel.right", PanelSide::Right, 48, 28),
            bottom_panel: ResizablePanel::new("panel.bottom", PanelSide::Bottom, 12, 6),
            left_tab: LeftPanelTab::Workspace,
            right_tab: None,
            bottom_visible: true,
            bottom_tab: BottomTab::Problems,
            active_drag: None,
            suppress_interactions: false,
        }
    }
}

impl PanelLayout {
    fn panel_mut(&mut self, id: PanelId) -> &mut ResizablePanel {
        match id {
            PanelId::Sidebar => &mut self.sidebar,
            PanelId::RightPanel => &mut self.right_panel,
            PanelId::BottomPanel => &mut self.bottom_panel,
        }
    }

    pub fn interactions_suppressed(&self) -> bool {
        self.suppress_interactions
    }

    pub fn begin_drag(&mut self, id: PanelId) {
        self.active_drag = Some(id);
        self.suppress_interactions = true;
        self.panel_mut(id).begin_drag();
    }

    pub fn pointer_moved(&mut self, x: u16, y: u16, viewport_w: u16, viewport_h: u16) -> bool {
        match self.active_drag {
            Some(id) => self.panel_mut(id).drag_to(x, y, viewport_w, viewport_h),
            None => false,
        }
    }

    /// 松开即回 idle；即便 release 事件在别处丢了，teardown 走 `reset` 兜底。
    pub fn pointer_released(&mut self) -> bool {
        let changed = match self.active_drag.take() {
            Some(id) => self.panel_mut(id).end_drag(),
            None => false,
        };
        self.suppress_interactions = false;
        changed
    }

    pub fn reset(&mut self) -> bool {
        let mut changed = self.sidebar.end_drag();
        changed |= self.right_panel.end_drag();
        changed |= self.bottom_panel.end_drag();
        changed |= self.active_drag.take().is_some();
        changed |= self.suppress_interactions;
        self.suppress_interactions = false;
        changed
    }

    pub fn panel_sizes(&self) -> BTreeMap<String, u16> {
        let mut sizes = BTreeMap::new();
        for panel in [&self.sidebar, &self.right_panel, &self.bottom_panel] {
            sizes.insert(panel.key.to_string(), panel.size());
        }
        sizes
    }

    pub fn restore_sizes(&mut self, sizes: &BTreeMap<String, u16>) {
        for panel in [
            &mut self.sidebar,
            &mut self.right_panel,
            &mut self.bottom_panel,
        ] {
            panel.restore(sizes.get(panel.key).copied());
        }
    }

    /// 关掉的终端若正是活动底栏标签，回退到 Problems。
    pub fn on_terminal_closed(&mut self, id: TerminalId) -> bool {
        if self.bottom_tab == BottomTab::Terminal(id) {
            self.bottom_tab = BottomTab::Problems;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_matches_initial_before_any_drag() {
        let layout = PanelLayout::default();
        assert_eq!(layout.sidebar.size(), 36);
        assert_eq!(layout.bottom_panel.size(), 12);
    }

    #[test]
    fn drag_never_drops_below_min_size() {
        let mut layout = PanelLayout::default();
        layout.begin_drag(PanelId::Sidebar);
        assert!(layout.pointer_moved(30, 0, 120, 40));
        assert_eq!(layout.sidebar.size(), 30);

        // 低于 min_size(20) 的位移被拒绝，旧值保留
        assert!(!layout.pointer_moved(5, 0, 120, 40));
        assert_eq!(layout.sidebar.size(), 30);

        for x in [0u16, 19, 21, 80, 3] {
            layout.pointer_moved(x, 0, 120, 40);
            assert!(layout.sidebar.size() >= layout.sidebar.min_size());
        }
        layout.pointer_released();
    }

    #[test]
    fn bottom_panel_resizes_from_bottom_edge() {
        let mut layout = PanelLayout::default();
        layout.begin_drag(PanelId::BottomPanel);
        assert!(layout.pointer_moved(0, 30, 120, 40));
        assert_eq!(layout.bottom_panel.size(), 10);
    }

    #[test]
    fn moves_without_drag_are_ignored() {
        let mut layout = PanelLayout::default();
        assert!(!layout.pointer_moved(50, 0, 120, 40));
        assert_eq!(layout.sidebar.size(), 36);
    }

    #[test]
    fn release_lifts_suppression_unconditionally() {
        let mut layout = PanelLayout::default();
        layout.begin_drag(PanelId::RightPanel);
        assert!(layout.interactions_suppressed());
        layout.pointer_released();
        assert!(!layout.interactions_suppressed());
        assert!(!layout.right_panel.is_resizing());

        // release 丢失时 reset 兜底
        layout.begin_drag(PanelId::Sidebar);
        layout.reset();
        assert!(!layout.interactions_suppressed());
        assert!(!layout.sidebar.is_resizing());
    }

    #[test]
    fn persisted_size_below_min_falls_back_to_initial() {
        let mut layout = PanelLayout::default();
        let mut sizes = BTreeMap::new();
        sizes.insert("panel.sidebar".to_string(), 3u16);
        sizes.insert("panel.right".to_string(), 60u16);
        layout.restore_sizes(&sizes);
        assert_eq!(layout.sidebar.size(), 36);
        assert_eq!(layout.right_panel.size(), 60);
        // 没有记录的面板维持初始值
        assert_eq!(layout.bottom_panel.size(), 12);
    }

    #[test]
    fn closing_active_terminal_tab_falls_back_to_problems() {
        let mut layout = PanelLayout::default();
        layout.bottom_tab = BottomTab::Terminal(7);
        assert!(layout.on_terminal_closed(7));
        assert_eq!(layout.bottom_tab, BottomTab::Problems);
        assert!(!layout.on_terminal_closed(9));
    }
}
