//! 编辑器缓冲与标签页管理，以及行内 AI 协议状态。
//!
//! 打开的文件只是树节点上的一个视图：关闭标签不删节点，删节点必须驱逐标签。

use rustc_hash::FxHashSet;

use super::workspace::NodeId;

#[derive(Debug, Default)]
pub struct EditorState {
    open_files: Vec<NodeId>,
    active: Option<NodeId>,
    pub inline: InlineAi,
    pub fixes: FixTracker,
}

impl EditorState {
    pub fn open_files(&self) -> &[NodeId] {
        &self.open_files
    }

    pub fn active(&self) -> Option<NodeId> {
        self.active
    }

    pub fn open(&mut self, id: NodeId) -> bool {
        let mut changed = false;
        if !self.open_files.contains(&id) {
            self.open_files.push(id);
            changed = true;
        }
        if self.active != Some(id) {
            self.active = Some(id);
            changed = true;
        }
        changed
    }

    /// 关闭标签；若关闭的是活动页，回退到列表序中它之后的一个（夹到末尾），否则 None。
    pub fn close(&mut self, id: NodeId) -> bool {
        let Some(index) = self.open_files.iter().position(|f| *f == id) else {
            return false;
        };
        self.open_files.remove(index);
        if self.active == Some(id) {
            self.active = if self.open_files.is_empty() {
                None
            } else {
                Some(self.open_files[index.min(self.open_files.len() - 1)])
            };
        }
        true
    }

    pub fn activate(&mut self, id: NodeId) -> bool {
        if self.open_files.contains(&id) && self.active != Some(id) {
            self.active = Some(id);
            return true;
        }
        false
    }

    /// 级联驱逐：工作区删除后，被删 id 全部关店，活动页按 close 的回退策略重选。
    pub fn evict(&mut self, removed: &[NodeId]) -> bool {
        let set: FxHashSet<NodeId> = removed.iter().copied().collect();
        let active_index = self
            .active
            .and_then(|a| self.open_files.iter().position(|f| *f == a));
        let before = self.open_files.len();
        self.open_files.retain(|f| !set.contains(f));

        if self.active.is_some_and(|a| set.contains(&a)) {
            self.active = if self.open_files.is_empty() {
                None
            } else {
                let index = active_index.unwrap_or(0).min(self.open_files.len() - 1);
                Some(self.open_files[index])
            };
        }
        before != self.open_files.len()
    }
}

// ---------------------------------------------------------------------------
// 行内 AI：generate 针对零宽光标，edit 针对非空选区，结果走接受/拒绝的 diff 流。

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InlinePrompt {
    pub start: usize,
    pub end: usize,
}

impl InlinePrompt {
    pub fn is_generate(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionStatus {
    Loading,
    Ready { new_code: String },
}

#[derive(Debug, Clone)]
pub struct InlineSuggestion {
    pub request_id: u64,
    pub start: usize,
    pub end: usize,
    pub old_code: String,
    /// 由逐行修复触发时记录行号，接受/拒绝/取消时释放 FixTracker。
    pub fix_line: Option<u32>,
    pub status: SuggestionStatus,
}

#[derive(Debug, Clone, Copy)]
struct PendingGenerate {
    request_id: u64,
    at: usize,
}

#[derive(Debug, Default)]
pub struct InlineAi {
    next_request_id: u64,
    pub prompt: Option<InlinePrompt>,
    pub suggestion: Option<InlineSuggestion>,
    pending_generate: Option<PendingGenerate>,
}

impl InlineAi {
    /// 建议未决时禁止重新触发（UI 级别的去重，不排队）。
    pub fn open_prompt(&mut self, start: usize, end: usize) -> bool {
        if self.suggestion.is_some() || self.prompt.is_some() {
            return false;
        }
        self.prompt = Some(InlinePrompt { start, end });
        true
    }

    pub fn close_prompt(&mut self) -> bool {
        self.prompt.take().is_some()
    }

    fn next_id(&mut self) -> u64 {
        self.next_request_id += 1;
        self.next_request_id
    }

    /// 提交 generate：提示框立即关闭，结果到达时在原光标处拼接。
    pub fn submit_generate(&mut self, at: usize) -> u64 {
        self.prompt = None;
        let request_id = self.next_id();
        self.pending_generate = Some(PendingGenerate { request_id, at });
        request_id
    }

    /// 提交 edit：进入 Loading 态的 diff 视图。
    pub fn submit_edit(&mut self, start: usize, end: usize, old_code: String) -> u64 {
        self.prompt = None;
        let request_id = self.next_id();
        self.suggestion = Some(InlineSuggestion {
            request_id,
            start,
            end,
            old_code,
            fix_line: None,
            status: SuggestionStatus::Loading,
        });
        request_id
    }

    pub fn submit_line_fix(&mut self, line: u32, start: usize, end: usize, old_code: String) -> u64 {
        let request_id = self.submit_edit(start, end, old_code);
        if let Some(suggestion) = self.suggestion.as_mut() {
            suggestion.fix_line = Some(line);
        }
        request_id
    }

    /// generate 完成：id 匹配则给出拼接点，过期结果直接丢弃。
    pub fn take_generate_target(&mut self, request_id: u64) -> Option<usize> {
        match self.pending_generate {
            Some(pending) if pending.request_id == request_id => {
                self.pending_generate = None;
                Some(pending.at)
            }
            _ => None,
        }
    }

    /// edit 完成：仅在当前 Loading 建议的 id 匹配时置 Ready。
    pub fn resolve_suggestion(&mut self, request_id: u64, new_code: String) -> bool {
        match self.suggestion.as_mut() {
            Some(s) if s.request_id == request_id && s.status == SuggestionStatus::Loading => {
                s.status = SuggestionStatus::Ready { new_code };
                true
            }
            _ => false,
        }
    }

    /// 接受：返回 (range, 替换文本)，由调用方写回缓冲。
    pub fn accept(&mut self) -> Option<(usize, usize, String, Option<u32>)> {
        let suggestion = self.suggestion.take()?;
        match suggestion.status {
            SuggestionStatus::Ready { new_code } => Some((
                suggestion.start,
                suggestion.end,
                new_code,
                suggestion.fix_line,
            )),
            SuggestionStatus::Loading => {
                // 未就绪不可接受，放回去
                self.suggestion = Some(suggestion);
                None
            }
        }
    }

    pub fn reject(&mut self) -> Option<u32> {
        self.suggestion.take().and_then(|s| s.fix_line)
    }

    /// 滚动或其他沟槽交互：关掉视图但不取消在途请求，结果到达时因 id 失配被丢弃。
    pub fn dismiss_views(&mut self) -> (bool, Option<u32>) {
        let had_prompt = self.prompt.take().is_some();
        let fix_line = self.suggestion.take().and_then(|s| s.fix_line);
        (had_prompt || fix_line.is_some(), fix_line)
    }

    pub fn take_failed(&mut self, request_id: u64) -> Option<u32> {
        match &self.suggestion {
            Some(s) if s.request_id == request_id => self.suggestion.take().and_then(|s| s.fix_line),
            _ => {
                if self
                    .pending_generate
                    .is_some_and(|p| p.request_id == request_id)
                {
                    self.pending_generate = None;
                }
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// 修复在途跟踪：key 是行号，另有一个全局 fix-all 标志。只做触发级去重，不排队。

#[derive(Debug, Default)]
pub struct FixTracker {
    lines: FxHashSet<u32>,
    fixing_all: bool,
}

impl FixTracker {
    pub fn can_fix_line(&self, line: u32) -> bool {
        !self.fixing_all && !self.lines.contains(&line)
    }

    pub fn can_fix_all(&self) -> bool {
        !self.fixing_all && self.lines.is_empty()
    }

    pub fn start_line(&mut self, line: u32) {
        self.lines.insert(line);
    }

    pub fn finish_line(&mut self, line: u32) {
        self.lines.remove(&line);
    }

    pub fn start_all(&mut self) {
        self.fixing_all = true;
    }

    pub fn finish_all(&mut self) {
        self.fixing_all = false;
    }

    pub fn is_fixing_all(&self) -> bool {
        self.fixing_all
    }

    pub fn is_fixing_line(&self, line: u32) -> bool {
        self.lines.contains(&line)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.fixing_all = false;
    }
}

/// 1-based 行号到字节区间（不含行尾换行）。
pub fn line_range(text: &str, line: u32) -> Option<(usize, usize)> {
    if line == 0 {
        return None;
    }
    let mut start = 0usize;
    let mut current = 1u32;
    for (index, byte) in text.bytes().enumerate() {
        if current == line && byte == b'\n' {
            return Some((start, index));
        }
        if byte == b'\n' {
            start = index + 1;
            current += 1;
        }
    }
    if current == line {
        Some((start, text.len()))
    } else {
        None
    }
}

/// 越界偏移夹到文本末尾，再退到最近的字符边界。
/// 提交行内请求时记下的字节偏移可能落在此后编辑出的多字节字符中间。
fn snap(text: &str, at: usize) -> usize {
    let mut at = at.min(text.len());
    while !text.is_char_boundary(at) {
        at -= 1;
    }
    at
}

/// 拼接替换：`[start, end)` 换成 `replacement`。
pub fn splice(text: &str, start: usize, end: usize, replacement: &str) -> String {
    let start = snap(text, start);
    let end = snap(text, end).max(start);
    let mut result = String::with_capacity(text.len() - (end - start) + replacement.len());
    result.push_str(&text[..start]);
    result.push_str(replacement);
    result.push_str(&text[end..]);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::workspace::{NodeKind, Workspace};

    fn three_files() -> (Workspace, NodeId, NodeId, NodeId) {
        let mut ws = Workspace::new();
        let x = ws.create("x.php".to_string(), NodeKind::File, None).unwrap();
        let y = ws.create("y.php".to_string(), NodeKind::File, None).unwrap();
        let z = ws.create("z.php".to_string(), NodeKind::File, None).unwrap();
        (ws, x, y, z)
    }

    #[test]
    fn open_appends_once_and_activates() {
        let (_ws, x, y, _z) = three_files();
        let mut editor = EditorState::default();
        editor.open(x);
        editor.open(y);
        editor.open(x);
        assert_eq!(editor.open_files(), &[x, y]);
        assert_eq!(editor.active(), Some(x));
    }

    #[test]
    fn close_active_picks_next_in_list_order() {
        let (_ws, x, y, z) = three_files();
        let mut editor = EditorState::default();
        editor.open(x);
        editor.open(y);
        editor.open(z);
        editor.activate(y);

        editor.close(y);
        assert_eq!(editor.active(), Some(z));
        assert_eq!(editor.open_files(), &[x, z]);
    }

    #[test]
    fn close_last_tab_leaves_no_active() {
        let (_ws, x, _y, _z) = three_files();
        let mut editor = EditorState::default();
        editor.open(x);
        editor.close(x);
        assert_eq!(editor.active(), None);
        assert!(editor.open_files().is_empty());
    }

    #[test]
    fn close_inactive_keeps_active() {
        let (_ws, x, y, _z) = three_files();
        let mut editor = EditorState::default();
        editor.open(x);
        editor.open(y);
        editor.close(x);
        assert_eq!(editor.active(), Some(y));
    }

    #[test]
    fn evict_removes_all_and_reselects() {
        let (mut ws, x, y, z) = three_files();
        let mut editor = EditorState::default();
        editor.open(x);
        editor.open(y);
        editor.open(z);
        editor.activate(y);

        let removed = ws.delete(y).unwrap();
        editor.evict(&removed);
        assert_eq!(editor.open_files(), &[x, z]);
        assert_eq!(editor.active(), Some(z));

        let removed = ws.delete(x).unwrap();
        let mut also = ws.delete(z).unwrap();
        let mut all = removed;
        all.append(&mut also);
        editor.evict(&all);
        assert_eq!(editor.active(), None);
    }

    #[test]
    fn prompt_blocked_while_suggestion_pending() {
        let mut inline = InlineAi::default();
        assert!(inline.open_prompt(3, 9));
        let id = inline.submit_edit(3, 9, "old".to_string());
        assert!(!inline.open_prompt(0, 0));
        assert!(inline.resolve_suggestion(id, "new".to_string()));
        let (start, end, code, fix) = inline.accept().unwrap();
        assert_eq!((start, end, code.as_str(), fix), (3, 9, "new", None));
        assert!(inline.open_prompt(0, 0));
    }

    #[test]
    fn stale_completion_is_discarded_after_dismiss() {
        let mut inline = InlineAi::default();
        inline.open_prompt(2, 6);
        let id = inline.submit_edit(2, 6, "ab".to_string());
        inline.dismiss_views();
        assert!(!inline.resolve_suggestion(id, "cd".to_string()));
        assert!(inline.accept().is_none());
    }

    #[test]
    fn generate_target_honors_request_id() {
        let mut inline = InlineAi::default();
        inline.open_prompt(5, 5);
        let id = inline.submit_generate(5);
        assert_eq!(inline.take_generate_target(id + 1), None);
        assert_eq!(inline.take_generate_target(id), Some(5));
        // 只允许兑现一次
        assert_eq!(inline.take_generate_target(id), None);
    }

    #[test]
    fn fix_tracker_mutual_exclusion() {
        let mut fixes = FixTracker::default();
        assert!(fixes.can_fix_line(3));
        fixes.start_line(3);
        assert!(!fixes.can_fix_line(3));
        assert!(fixes.can_fix_line(4)); // 不同行可并行
        assert!(!fixes.can_fix_all()); // fix-all 与逐行互斥

        fixes.finish_line(3);
        fixes.start_all();
        assert!(!fixes.can_fix_line(7));
        fixes.finish_all();
        assert!(fixes.can_fix_all());
    }

    #[test]
    fn line_range_is_one_based_and_excludes_newline() {
        let text = "alpha\nbeta\ngamma";
        assert_eq!(line_range(text, 1), Some((0, 5)));
        assert_eq!(line_range(text, 2), Some((6, 10)));
        assert_eq!(line_range(text, 3), Some((11, 16)));
        assert_eq!(line_range(text, 4), None);
        assert_eq!(line_range(text, 0), None);
        assert_eq!(&text[6..10], "beta");
    }

    #[test]
    fn splice_replaces_range() {
        assert_eq!(splice("hello world", 6, 11, "php"), "hello php");
        assert_eq!(splice("ab", 1, 1, "X"), "aXb");
        assert_eq!(splice("ab", 9, 12, "X"), "abX");
    }

    #[test]
    fn splice_snaps_offsets_inside_multibyte_chars() {
        // é 占两字节，偏移 1 落在其内部，退到字符起点
        assert_eq!(splice("éb", 1, 1, "X"), "Xéb");
        assert_eq!(splice("aé", 2, 3, "X"), "aX");
        assert_eq!(splice("日本語", 1, 5, "X"), "X本語");
    }
}
