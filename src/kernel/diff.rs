//! 建议视图用的词级 diff：空白作为分隔也算词，LCS 对齐。

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    Equal,
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRun {
    pub kind: DiffKind,
    pub text: String,
}

fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0usize;
    let mut in_space = None;
    for (index, ch) in text.char_indices() {
        let space = ch.is_whitespace();
        if in_space.is_some_and(|s| s != space) {
            tokens.push(&text[start..index]);
            start = index;
        }
        in_space = Some(space);
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

fn push_run(runs: &mut Vec<DiffRun>, kind: DiffKind, text: &str) {
    match runs.last_mut() {
        Some(last) if last.kind == kind => last.text.push_str(text),
        _ => runs.push(DiffRun {
            kind,
            text: text.to_string(),
        }),
    }
}

/// 旧文到新文的词级差异，相邻同类 run 合并。
pub fn word_diff(old: &str, new: &str) -> Vec<DiffRun> {
    let a = tokenize(old);
    let b = tokenize(new);

    // 经典 LCS 表；建议片段都很短，O(n*m) 足够
    let mut table = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for i in (0..a.len()).rev() {
        for j in (0..b.len()).rev() {
            table[i][j] = if a[i] == b[j] {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }

    let mut runs = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] == b[j] {
            push_run(&mut runs, DiffKind::Equal, a[i]);
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            push_run(&mut runs, DiffKind::Removed, a[i]);
            i += 1;
        } else {
            push_run(&mut runs, DiffKind::Added, b[j]);
            j += 1;
        }
    }
    while i < a.len() {
        push_run(&mut runs, DiffKind::Removed, a[i]);
        i += 1;
    }
    while j < b.len() {
        push_run(&mut runs, DiffKind::Added, b[j]);
        j += 1;
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(runs: &[DiffRun]) -> String {
        runs.iter()
            .map(|r| match r.kind {
                DiffKind::Equal => r.text.clone(),
                DiffKind::Added => format!("[+{}]", r.text),
                DiffKind::Removed => format!("[-{}]", r.text),
            })
            .collect()
    }

    #[test]
    fn identical_text_is_one_equal_run() {
        let runs = word_diff("echo $name;", "echo $name;");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].kind, DiffKind::Equal);
    }

    #[test]
    fn single_word_change() {
        let runs = word_diff("echo $name;", "echo $title;");
        assert_eq!(render(&runs), "echo [-$name;][+$title;]");
    }

    #[test]
    fn pure_insert_and_delete() {
        assert_eq!(render(&word_diff("", "new code")), "[+new code]");
        assert_eq!(render(&word_diff("old", "")), "[-old]");
    }

    #[test]
    fn reassembling_runs_reproduces_both_sides() {
        let old = "$total = $a + $b;";
        let new = "$total = $a + $b + $c;";
        let runs = word_diff(old, new);
        let old_again: String = runs
            .iter()
            .filter(|r| r.kind != DiffKind::Added)
            .map(|r| r.text.as_str())
            .collect();
        let new_again: String = runs
            .iter()
            .filter(|r| r.kind != DiffKind::Removed)
            .map(|r| r.text.as_str())
            .collect();
        assert_eq!(old_again, old);
        assert_eq!(new_again, new);
    }
}
