//! 工作区文件树数据模型
//!
//! 纯内存虚拟文件系统：arena + id 查找，消费方只持有 id，不持有节点引用。

use rustc_hash::FxHashSet;
use slotmap::{new_key_type, SlotMap};
use std::{collections::BTreeMap, fmt};

use serde_json::{json, Value};

new_key_type! { pub struct NodeId; }

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Folder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceError {
    NameExists,
    EmptyName,
    ParentNotFolder,
    InvalidNode,
    RootImmutable,
}

impl fmt::Display for WorkspaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkspaceError::NameExists => write!(f, "name already exists in parent"),
            WorkspaceError::EmptyName => write!(f, "name is empty"),
            WorkspaceError::ParentNotFolder => write!(f, "parent is not a folder"),
            WorkspaceError::InvalidNode => write!(f, "invalid node id"),
            WorkspaceError::RootImmutable => write!(f, "workspace root cannot be modified"),
        }
    }
}

impl std::error::Error for WorkspaceError {}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    name: String,
    serial: u64,
    parent: Option<NodeId>,
    content: String,
    children: Option<BTreeMap<String, NodeId>>,
}

impl Node {
    fn new_file(name: String, serial: u64, parent: Option<NodeId>, content: String) -> Self {
        Self {
            kind: NodeKind::File,
            name,
            serial,
            parent,
            content,
            children: None,
        }
    }

    fn new_folder(name: String, serial: u64, parent: Option<NodeId>) -> Self {
        Self {
            kind: NodeKind::Folder,
            name,
            serial,
            parent,
            content: String::new(),
            children: Some(BTreeMap::new()),
        }
    }
}

/// 导出视角下的一个条目；`content == None` 表示文件夹。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportEntry {
    pub path: String,
    pub content: Option<String>,
}

pub struct Workspace {
    arena: SlotMap<NodeId, Node>,
    root: NodeId,
    next_serial: u64,
    expanded: FxHashSet<NodeId>,
    selected: Option<NodeId>,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Workspace {
    pub fn new() -> Self {
        let mut arena = SlotMap::with_key();
        let root = arena.insert(Node::new_folder("workspace".to_string(), 0, None));

        let mut expanded = FxHashSet::default();
        expanded.insert(root);

        Self {
            arena,
            root,
            next_serial: 1,
            expanded,
            selected: None,
        }
    }

    /// 默认学习工作区：一个入口脚本加上 src 目录。
    pub fn with_starter_files() -> Self {
        let mut ws = Self::new();
        let _ = ws.create(
            "index.php".to_string(),
            NodeKind::File,
            None,
        );
        if let Ok(src) = ws.create("src".to_string(), NodeKind::Folder, None) {
            let _ = ws.create("helpers.php".to_string(), NodeKind::File, Some(src));
            ws.expand(src);
        }
        if let Some(id) = ws.find_by_path("index.php") {
            ws.set_file_content(id, "<?php\n\necho \"Hello, PHP!\";\n".to_string());
        }
        ws
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    pub fn set_selected(&mut self, id: Option<NodeId>) {
        self.selected = id;
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.contains_key(id)
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.arena.get(id).map(|n| n.name.as_str())
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.arena.get(id).map(|n| n.kind)
    }

    pub fn is_folder(&self, id: NodeId) -> bool {
        self.kind(id) == Some(NodeKind::Folder)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id).and_then(|n| n.parent)
    }

    pub fn file_count(&self) -> usize {
        self.arena
            .values()
            .filter(|n| n.kind == NodeKind::File)
            .count()
    }

    /// `parent = None` 表示根层级。重名、空名或非法父节点一律拒绝，树保持不变。
    pub fn create(
        &mut self,
        name: String,
        kind: NodeKind,
        parent: Option<NodeId>,
    ) -> Result<NodeId, WorkspaceError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(WorkspaceError::EmptyName);
        }

        let parent_id = parent.unwrap_or(self.root);
        {
            let parent_ro = self
                .arena
                .get(parent_id)
                .ok_or(WorkspaceError::InvalidNode)?;
            let children = parent_ro
                .children
                .as_ref()
                .ok_or(WorkspaceError::ParentNotFolder)?;
            if children.contains_key(&name) {
                return Err(WorkspaceError::NameExists);
            }
        }

        let serial = self.next_serial;
        self.next_serial += 1;
        let node = match kind {
            NodeKind::File => Node::new_file(name.clone(), serial, Some(parent_id), String::new()),
            NodeKind::Folder => Node::new_folder(name.clone(), serial, Some(parent_id)),
        };
        let id = self.arena.insert(node);

        let parent_node = self
            .arena
            .get_mut(parent_id)
            .ok_or(WorkspaceError::InvalidNode)?;
        let children = parent_node
            .children
            .as_mut()
            .ok_or(WorkspaceError::ParentNotFolder)?;
        children.insert(name, id);

        Ok(id)
    }

    /// 同名是 no-op；兄弟冲突失败且不做任何修改。
    pub fn rename(&mut self, id: NodeId, new_name: String) -> Result<(), WorkspaceError> {
        if id == self.root {
            return Err(WorkspaceError::RootImmutable);
        }
        let new_name = new_name.trim().to_string();
        if new_name.is_empty() {
            return Err(WorkspaceError::EmptyName);
        }

        let (parent, old_name) = {
            let node = self.arena.get(id).ok_or(WorkspaceError::InvalidNode)?;
            (node.parent, node.name.clone())
        };

        if old_name == new_name {
            return Ok(());
        }

        if let Some(parent_id) = parent {
            let parent_node = self
                .arena
                .get_mut(parent_id)
                .ok_or(WorkspaceError::InvalidNode)?;
            let children = parent_node
                .children
                .as_mut()
                .ok_or(WorkspaceError::ParentNotFolder)?;
            if children.contains_key(&new_name) {
                return Err(WorkspaceError::NameExists);
            }
            children.remove(&old_name);
            children.insert(new_name.clone(), id);
        }

        self.arena
            .get_mut(id)
            .ok_or(WorkspaceError::InvalidNode)?
            .name = new_name;
        Ok(())
    }

    /// 递归删除，返回被移除的全部 id（含自身），调用方据此驱逐打开的标签页。
    pub fn delete(&mut self, id: NodeId) -> Result<Vec<NodeId>, WorkspaceError> {
        if id == self.root {
            return Err(WorkspaceError::RootImmutable);
        }

        let (parent, name) = {
            let node = self.arena.get(id).ok_or(WorkspaceError::InvalidNode)?;
            (node.parent, node.name.clone())
        };

        if let Some(parent_id) = parent {
            if let Some(children) = self
                .arena
                .get_mut(parent_id)
                .and_then(|n| n.children.as_mut())
            {
                children.remove(&name);
            }
        }

        let mut removed = Vec::new();
        self.recursive_remove(id, &mut removed);
        Ok(removed)
    }

    fn recursive_remove(&mut self, id: NodeId, removed: &mut Vec<NodeId>) {
        if let Some(node) = self.arena.get(id).cloned() {
            if let Some(children) = node.children {
                for (_, child_id) in children {
                    self.recursive_remove(child_id, removed);
                }
            }

            self.expanded.remove(&id);
            if self.selected == Some(id) {
                self.selected = node.parent.filter(|p| *p != self.root);
            }

            self.arena.remove(id);
            removed.push(id);
        }
    }

    pub fn file_content(&self, id: NodeId) -> Option<&str> {
        self.arena
            .get(id)
            .filter(|n| n.kind == NodeKind::File)
            .map(|n| n.content.as_str())
    }

    pub fn set_file_content(&mut self, id: NodeId, content: String) -> bool {
        match self.arena.get_mut(id) {
            Some(node) if node.kind == NodeKind::File => {
                node.content = content;
                true
            }
            _ => false,
        }
    }

    pub fn toggle_expand(&mut self, id: NodeId) {
        if self.is_folder(id) {
            if self.expanded.contains(&id) {
                self.expanded.remove(&id);
            } else {
                self.expanded.insert(id);
            }
        }
    }

    pub fn expand(&mut self, id: NodeId) {
        if self.is_folder(id) {
            self.expanded.insert(id);
        }
    }

    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.expanded.contains(&id)
    }

    /// 展示序：文件夹在前，同类按名字典序。每次渲染重算，不落存储。
    fn sorted_children(&self, id: NodeId) -> Vec<NodeId> {
        let Some(children) = self.arena.get(id).and_then(|n| n.children.as_ref()) else {
            return Vec::new();
        };

        let mut folders = Vec::new();
        let mut files = Vec::new();
        for &child_id in children.values() {
            if let Some(child) = self.arena.get(child_id) {
                if child.kind == NodeKind::Folder {
                    folders.push(child_id);
                } else {
                    files.push(child_id);
                }
            }
        }
        folders.extend(files);
        folders
    }

    pub fn rows(&self) -> Vec<WorkspaceRow> {
        let mut result = Vec::new();
        let mut stack: Vec<(NodeId, u16)> = self
            .sorted_children(self.root)
            .into_iter()
            .rev()
            .map(|id| (id, 0))
            .collect();

        while let Some((id, depth)) = stack.pop() {
            let Some(node) = self.arena.get(id) else {
                continue;
            };
            let is_folder = node.kind == NodeKind::Folder;
            let is_expanded = self.expanded.contains(&id);
            result.push(WorkspaceRow {
                id,
                depth,
                name: node.name.clone(),
                is_folder,
                is_expanded,
            });

            if is_folder && is_expanded {
                for child_id in self.sorted_children(id).into_iter().rev() {
                    stack.push((child_id, depth + 1));
                }
            }
        }

        result
    }

    /// 自工作区根的斜杠路径，例如 `src/Button.php`。
    pub fn node_path(&self, id: NodeId) -> Option<String> {
        if id == self.root {
            return Some(String::new());
        }
        let mut components = Vec::new();
        let mut current = id;
        while let Some(node) = self.arena.get(current) {
            let parent = node.parent?;
            components.push(node.name.clone());
            if parent == self.root {
                break;
            }
            current = parent;
        }
        components.reverse();
        Some(components.join("/"))
    }

    pub fn find_by_path(&self, path: &str) -> Option<NodeId> {
        let mut current = self.root;
        for component in path.split('/').filter(|c| !c.is_empty()) {
            let children = self.arena.get(current)?.children.as_ref()?;
            current = *children.get(component)?;
        }
        if current == self.root {
            None
        } else {
            Some(current)
        }
    }

    /// 按路径创建，缺失的父目录一并补齐（代理动作的约定）。
    pub fn create_at_path(
        &mut self,
        path: &str,
        kind: NodeKind,
        content: Option<String>,
    ) -> Result<NodeId, WorkspaceError> {
        let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        let Some((leaf, folders)) = components.split_last() else {
            return Err(WorkspaceError::EmptyName);
        };

        let mut parent = self.root;
        for folder in folders {
            let existing = self
                .arena
                .get(parent)
                .and_then(|n| n.children.as_ref())
                .and_then(|c| c.get(*folder).copied());
            parent = match existing {
                Some(id) if self.is_folder(id) => id,
                Some(_) => return Err(WorkspaceError::ParentNotFolder),
                None => self.create(folder.to_string(), NodeKind::Folder, Some(parent))?,
            };
        }

        let id = self.create(leaf.to_string(), kind, Some(parent))?;
        if let (NodeKind::File, Some(text)) = (kind, content) {
            self.set_file_content(id, text);
        }
        Ok(id)
    }

    pub fn update_at_path(&mut self, path: &str, content: String) -> Result<(), WorkspaceError> {
        let id = self.find_by_path(path).ok_or(WorkspaceError::InvalidNode)?;
        if self.set_file_content(id, content) {
            Ok(())
        } else {
            Err(WorkspaceError::ParentNotFolder)
        }
    }

    pub fn delete_at_path(&mut self, path: &str) -> Result<Vec<NodeId>, WorkspaceError> {
        let id = self.find_by_path(path).ok_or(WorkspaceError::InvalidNode)?;
        self.delete(id)
    }

    /// 发给预言机的快照。严格 child-first，无父指针，无需断环。
    pub fn snapshot(&self) -> Value {
        Value::Array(
            self.sorted_children(self.root)
                .into_iter()
                .map(|id| self.snapshot_node(id))
                .collect(),
        )
    }

    fn snapshot_node(&self, id: NodeId) -> Value {
        let Some(node) = self.arena.get(id) else {
            return Value::Null;
        };
        match node.kind {
            NodeKind::File => json!({
                "id": node.serial.to_string(),
                "name": node.name,
                "type": "file",
                "content": node.content,
            }),
            NodeKind::Folder => json!({
                "id": node.serial.to_string(),
                "name": node.name,
                "type": "folder",
                "children": self
                    .sorted_children(id)
                    .into_iter()
                    .map(|c| self.snapshot_node(c))
                    .collect::<Vec<_>>(),
            }),
        }
    }

    /// 单节点导出条目：文件产出一条，文件夹递归产出整棵子树（含空文件夹）。
    pub fn export_entries(&self, id: NodeId) -> Vec<ExportEntry> {
        let mut entries = Vec::new();
        self.collect_entries(id, "", &mut entries);
        entries
    }

    pub fn export_all_entries(&self) -> Vec<ExportEntry> {
        let mut entries = Vec::new();
        for child in self.sorted_children(self.root) {
            self.collect_entries(child, "", &mut entries);
        }
        entries
    }

    fn collect_entries(&self, id: NodeId, prefix: &str, entries: &mut Vec<ExportEntry>) {
        let Some(node) = self.arena.get(id) else {
            return;
        };
        let path = if prefix.is_empty() {
            node.name.clone()
        } else {
            format!("{prefix}/{}", node.name)
        };
        match node.kind {
            NodeKind::File => entries.push(ExportEntry {
                path,
                content: Some(node.content.clone()),
            }),
            NodeKind::Folder => {
                entries.push(ExportEntry {
                    path: path.clone(),
                    content: None,
                });
                for child in self.sorted_children(id) {
                    self.collect_entries(child, &path, entries);
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkspaceRow {
    pub id: NodeId,
    pub depth: u16,
    pub name: String,
    pub is_folder: bool,
    pub is_expanded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_rejects_sibling_collision() {
        let mut ws = Workspace::new();
        ws.create("a.php".to_string(), NodeKind::File, None).unwrap();
        let err = ws.create("a.php".to_string(), NodeKind::File, None);
        assert_eq!(err, Err(WorkspaceError::NameExists));

        let names: Vec<_> = ws.rows().iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, vec!["a.php".to_string()]);
    }

    #[test]
    fn create_with_unknown_parent_fails_safely() {
        let mut ws = Workspace::new();
        let folder = ws.create("dir".to_string(), NodeKind::Folder, None).unwrap();
        ws.delete(folder).unwrap();
        let err = ws.create("b.php".to_string(), NodeKind::File, Some(folder));
        assert_eq!(err, Err(WorkspaceError::InvalidNode));
        assert!(ws.rows().is_empty());
    }

    #[test]
    fn create_inside_file_fails() {
        let mut ws = Workspace::new();
        let file = ws.create("a.php".to_string(), NodeKind::File, None).unwrap();
        let err = ws.create("b.php".to_string(), NodeKind::File, Some(file));
        assert_eq!(err, Err(WorkspaceError::ParentNotFolder));
    }

    #[test]
    fn rename_same_name_is_noop_success() {
        let mut ws = Workspace::new();
        let id = ws.create("a.php".to_string(), NodeKind::File, None).unwrap();
        assert!(ws.rename(id, "a.php".to_string()).is_ok());
        assert_eq!(ws.name(id), Some("a.php"));
    }

    #[test]
    fn rename_collision_leaves_tree_unchanged() {
        let mut ws = Workspace::new();
        let a = ws.create("a.php".to_string(), NodeKind::File, None).unwrap();
        ws.create("b.php".to_string(), NodeKind::File, None).unwrap();

        assert_eq!(
            ws.rename(a, "b.php".to_string()),
            Err(WorkspaceError::NameExists)
        );
        assert_eq!(ws.name(a), Some("a.php"));
        assert!(ws.find_by_path("a.php").is_some());
        assert!(ws.find_by_path("b.php").is_some());
    }

    #[test]
    fn delete_folder_reports_all_descendants() {
        let mut ws = Workspace::new();
        let dir = ws.create("src".to_string(), NodeKind::Folder, None).unwrap();
        let sub = ws
            .create("lib".to_string(), NodeKind::Folder, Some(dir))
            .unwrap();
        let f1 = ws
            .create("a.php".to_string(), NodeKind::File, Some(dir))
            .unwrap();
        let f2 = ws
            .create("b.php".to_string(), NodeKind::File, Some(sub))
            .unwrap();

        let removed = ws.delete(dir).unwrap();
        for id in [dir, sub, f1, f2] {
            assert!(removed.contains(&id));
            assert!(!ws.contains(id));
        }
        assert!(ws.rows().is_empty());
    }

    #[test]
    fn rows_sort_folders_before_files() {
        let mut ws = Workspace::new();
        ws.create("zeta.php".to_string(), NodeKind::File, None).unwrap();
        ws.create("alpha.php".to_string(), NodeKind::File, None).unwrap();
        let dir = ws
            .create("vendor".to_string(), NodeKind::Folder, None)
            .unwrap();
        ws.create("inner.php".to_string(), NodeKind::File, Some(dir))
            .unwrap();

        let rows = ws.rows();
        let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
        // vendor 未展开，子节点不出现
        assert_eq!(names, vec!["vendor", "alpha.php", "zeta.php"]);

        ws.expand(dir);
        let names: Vec<_> = ws.rows().iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, vec!["vendor", "inner.php", "alpha.php", "zeta.php"]);
        assert_eq!(ws.rows()[1].depth, 1);
    }

    #[test]
    fn path_roundtrip() {
        let mut ws = Workspace::new();
        let id = ws
            .create_at_path("src/components/Button.php", NodeKind::File, Some("<?php".into()))
            .unwrap();
        assert_eq!(ws.node_path(id).as_deref(), Some("src/components/Button.php"));
        assert_eq!(ws.find_by_path("src/components/Button.php"), Some(id));
        assert_eq!(ws.file_content(id), Some("<?php"));
        assert!(ws.is_folder(ws.find_by_path("src/components").unwrap()));
    }

    #[test]
    fn snapshot_has_no_parent_refs() {
        let mut ws = Workspace::new();
        let dir = ws.create("src".to_string(), NodeKind::Folder, None).unwrap();
        let file = ws
            .create("a.php".to_string(), NodeKind::File, Some(dir))
            .unwrap();
        ws.set_file_content(file, "<?php echo 1;".to_string());

        let snap = ws.snapshot();
        let arr = snap.as_array().unwrap();
        assert_eq!(arr.len(), 1);
        assert_eq!(arr[0]["type"], "folder");
        assert_eq!(arr[0]["children"][0]["content"], "<?php echo 1;");
        assert!(arr[0].get("parent").is_none());
    }

    #[test]
    fn export_entries_preserve_structure_and_bytes() {
        let mut ws = Workspace::new();
        let dir = ws.create("app".to_string(), NodeKind::Folder, None).unwrap();
        let file = ws
            .create("run.php".to_string(), NodeKind::File, Some(dir))
            .unwrap();
        let body = "<?php\n// bytes \u{00e9}\u{4e2d}\n";
        ws.set_file_content(file, body.to_string());
        ws.create("empty".to_string(), NodeKind::Folder, Some(dir))
            .unwrap();

        let entries = ws.export_entries(dir);
        assert_eq!(entries[0], ExportEntry { path: "app".into(), content: None });
        assert!(entries.contains(&ExportEntry {
            path: "app/run.php".into(),
            content: Some(body.to_string()),
        }));
        assert!(entries.contains(&ExportEntry { path: "app/empty".into(), content: None }));
    }
}
