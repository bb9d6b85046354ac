//! 内核端到端：一次典型学习会话走完编辑、检查、修复、执行、导出。

use phpdojo::kernel::chat::{AgentAction, AgentActionKind, AgentKind, AgentResponse};
use phpdojo::kernel::layout::BottomTab;
use phpdojo::kernel::problems::{CodeProblem, ProblemSeverity};
use phpdojo::kernel::workspace::NodeKind;
use phpdojo::kernel::{Action, AppState, Effect, Store};
use phpdojo::oracle::ExecutionResult;
use phpdojo::services::persistence::{self, PersistedState};

fn problem(line: u32, message: &str) -> CodeProblem {
    CodeProblem {
        line,
        message: message.to_string(),
        severity: ProblemSeverity::Error,
    }
}

#[test]
fn editing_session_runs_and_previews_output() {
    let mut store = Store::new(AppState::new());
    let index = store.state().editor.active().expect("index.php open");

    let result = store.dispatch(Action::EditActiveFile {
        content: "<?php\necho \"<h1>Hi</h1>\";\n".to_string(),
    });
    let lint_file = match result.effects.as_slice() {
        [Effect::Lint { file, .. }] => *file,
        other => panic!("expected lint after edit, got {other:?}"),
    };
    assert_eq!(lint_file, index);

    store.dispatch(Action::LintFinished {
        file: index,
        problems: Vec::new(),
    });
    assert!(store.state().problems.items().is_empty());

    let result = store.dispatch(Action::RunActiveFile);
    let terminal = match result.effects.as_slice() {
        [Effect::ExecutePhp { terminal, code }] => {
            assert!(code.contains("<h1>Hi</h1>"));
            *terminal
        }
        other => panic!("expected execution, got {other:?}"),
    };
    assert!(store.state().executing);
    assert_eq!(store.state().layout.bottom_tab, BottomTab::Terminal(terminal));

    store.dispatch(Action::ExecutionFinished {
        terminal,
        result: Ok(ExecutionResult {
            terminal_output: String::new(),
            web_output: "<h1>Hi</h1>".to_string(),
        }),
    });
    assert!(!store.state().executing);
    assert_eq!(store.state().last_web_output, "<h1>Hi</h1>");
    // 有网页输出时预览面板自动亮起
    assert_eq!(
        store.state().layout.right_tab,
        Some(phpdojo::kernel::layout::RightPanelTab::Webview)
    );
}

#[test]
fn problem_fix_cycle_reaches_clean_buffer() {
    let mut store = Store::new(AppState::new());
    let index = store.state().editor.active().unwrap();
    store.dispatch(Action::EditActiveFile {
        content: "<?php\necho \"x\"\n".to_string(),
    });
    store.dispatch(Action::LintFinished {
        file: index,
        problems: vec![problem(2, "missing semicolon")],
    });
    assert_eq!(store.state().problems.error_count(), 1);

    let result = store.dispatch(Action::FixProblem { line: 2 });
    let request_id = match result.effects.as_slice() {
        [Effect::EditInline { request_id, .. }] => *request_id,
        other => panic!("expected inline fix, got {other:?}"),
    };

    store.dispatch(Action::InlineEditFinished {
        file: index,
        request_id,
        result: Ok("echo \"x\";".to_string()),
    });
    let result = store.dispatch(Action::InlineAccept);
    assert_eq!(
        store.state().workspace.file_content(index),
        Some("<?php\necho \"x\";\n")
    );
    assert!(matches!(result.effects.as_slice(), [Effect::Lint { .. }]));

    store.dispatch(Action::LintFinished {
        file: index,
        problems: Vec::new(),
    });
    assert_eq!(store.state().problems.error_count(), 0);
    assert!(store.state().editor.fixes.can_fix_line(2));
}

#[test]
fn builder_plan_apply_creates_and_opens_nothing_until_accepted() {
    let mut store = Store::new(AppState::new());
    store.dispatch(Action::SetAgent {
        agent: AgentKind::Builder,
    });
    store.dispatch(Action::SendChat {
        message: "make a router".to_string(),
        image: None,
    });
    store.dispatch(Action::AgentPlanFinished {
        result: Ok(AgentResponse {
            explanation: "Adding router.php and removing helpers".to_string(),
            actions: vec![
                AgentAction {
                    kind: AgentActionKind::CreateFile,
                    path: "router.php".to_string(),
                    content: Some("<?php // routes\n".to_string()),
                },
                AgentAction {
                    kind: AgentActionKind::DeleteFile,
                    path: "src/helpers.php".to_string(),
                    content: None,
                },
            ],
        }),
    });

    // 提案还没被接受，工作区不得有任何变动
    assert!(store.state().workspace.find_by_path("router.php").is_none());
    assert!(store.state().workspace.find_by_path("src/helpers.php").is_some());

    let message_id = store.state().chat.messages.last().unwrap().id;
    store.dispatch(Action::ApplyAgentActions { message_id });
    assert!(store.state().workspace.find_by_path("router.php").is_some());
    assert!(store.state().workspace.find_by_path("src/helpers.php").is_none());
}

#[test]
fn workspace_export_collects_full_tree() {
    let mut store = Store::new(AppState::new());
    store.dispatch(Action::CreateNode {
        name: "empty".to_string(),
        kind: NodeKind::Folder,
        parent: None,
    });
    let result = store.dispatch(Action::ExportWorkspace);
    match result.effects.as_slice() {
        [Effect::ExportZip {
            archive_name,
            entries,
        }] => {
            assert_eq!(archive_name, "workspace.zip");
            assert!(entries.iter().any(|e| e.path == "index.php"));
            assert!(entries.iter().any(|e| e.path == "src/helpers.php"));
            assert!(entries
                .iter()
                .any(|e| e.path == "empty" && e.content.is_none()));
        }
        other => panic!("expected zip export, got {other:?}"),
    }
}

#[test]
fn panel_sizes_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ui_state.json");

    let mut store = Store::new(AppState::new());
    store.dispatch(Action::PanelDragStart {
        panel: phpdojo::kernel::layout::PanelId::Sidebar,
    });
    store.dispatch(Action::PointerMoved {
        x: 44,
        y: 0,
        viewport_w: 160,
        viewport_h: 50,
    });
    let result = store.dispatch(Action::PointerReleased);
    let persisted = match result.effects.as_slice() {
        [Effect::SaveUiState { panel_sizes, notes }] => PersistedState {
            panel_sizes: panel_sizes.clone(),
            notes: notes.clone(),
        },
        other => panic!("expected save, got {other:?}"),
    };
    persistence::save_to(&path, &persisted).unwrap();

    let restored = persistence::load_from(&path);
    let mut fresh = Store::new(AppState::new());
    fresh.dispatch(Action::HydratePersisted {
        panel_sizes: restored.panel_sizes,
        notes: restored.notes,
    });
    assert_eq!(fresh.state().layout.sidebar.size(), 44);
}
