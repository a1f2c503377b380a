//! Line diff between current and proposed content.
//!
//! Plain LCS-based line diff in unified-ish notation, attached to update
//! jobs so reviewers can scan the change without external tooling.

/// Produce a human-readable line diff from `old` to `new`.
///
/// Unchanged lines are prefixed with two spaces, removals with `- `,
/// additions with `+ `. Returns an empty string when the inputs match.
pub fn line_diff(old: &str, new: &str) -> String {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();

    if old_lines == new_lines {
        return String::new();
    }

    // LCS table over lines.
    let n = old_lines.len();
    let m = new_lines.len();
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if old_lines[i] == new_lines[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old_lines[i] == new_lines[j] {
            out.push(format!("  {}", old_lines[i]));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            out.push(format!("- {}", old_lines[i]));
            i += 1;
        } else {
            out.push(format!("+ {}", new_lines[j]));
            j += 1;
        }
    }
    while i < n {
        out.push(format!("- {}", old_lines[i]));
        i += 1;
    }
    while j < m {
        out.push(format!("+ {}", new_lines[j]));
        j += 1;
    }

    out.join("\n")
}
