//! Small text builders shared by every emitter.

/// JSDoc block for `lines`, indented by `indent`. Empty input gives an empty string.
pub fn jsdoc(lines: &[String], indent: &str) -> String {
    let lines: Vec<&str> = lines
        .iter()
        .flat_map(|l| l.lines())
        .map(str::trim_end)
        .collect();
    match lines.as_slice() {
        [] => String::new(),
        [one] => format!("{indent}/** {} */\n", escape_comment(one)),
        many => {
            let mut out = format!("{indent}/**\n");
            for l in many {
                if l.is_empty() {
                    out.push_str(&format!("{indent} *\n"));
                } else {
                    out.push_str(&format!("{indent} * {}\n", escape_comment(l)));
                }
            }
            out.push_str(&format!("{indent} */\n"));
            out
        }
    }
}

fn escape_comment(s: &str) -> String {
    s.replace("*/", "*\\/")
}

/// True when `expr` has a top-level `|` or `&`, i.e. it must be parenthesized
/// before `[]`, another `&`, or an indexed access.
pub fn needs_parens(expr: &str) -> bool {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut prev = '\0';
    for c in expr.chars() {
        if in_string {
            if c == '"' && prev != '\\' {
                in_string = false;
            }
        } else {
            match c {
                '"' => in_string = true,
                '{' | '(' | '[' | '<' => depth += 1,
                '}' | ')' | ']' => depth -= 1,
                '>' if prev != '=' => depth -= 1,
                '|' | '&' if depth == 0 => return true,
                _ => {}
            }
        }
        prev = c;
    }
    false
}

pub fn parenthesize(expr: &str) -> String {
    if needs_parens(expr) { format!("({expr})") } else { expr.to_string() }
}

/// `A | B | C`, dropping duplicates while keeping first-seen order.
pub fn union_of(parts: &[String]) -> String {
    let mut seen: Vec<&str> = Vec::new();
    for p in parts {
        if !seen.contains(&p.as_str()) {
            seen.push(p);
        }
    }
    seen.join(" | ")
}

/// `A & B`, parenthesizing unions.
pub fn intersection_of(parts: &[String]) -> String {
    if parts.len() == 1 {
        return parts[0].clone();
    }
    parts
        .iter()
        .map(|p| if p.contains('|') { parenthesize(p) } else { p.clone() })
        .collect::<Vec<_>>()
        .join(" & ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parens_only_at_top_level() {
        assert!(needs_parens("A | B"));
        assert!(needs_parens("A & { x: string }"));
        assert!(!needs_parens("{ a: A | B }"));
        assert!(!needs_parens("Array<A | B>"));
        assert!(!needs_parens("\"a|b\""));
        assert!(!needs_parens("(value: A) => B"));
    }

    #[test]
    fn jsdoc_shapes() {
        assert_eq!(jsdoc(&[], ""), "");
        assert_eq!(jsdoc(&["one".into()], "  "), "  /** one */\n");
        assert_eq!(
            jsdoc(&["a".into(), "@minLength 1".into()], ""),
            "/**\n * a\n * @minLength 1\n */\n"
        );
    }

    #[test]
    fn unions_and_intersections() {
        assert_eq!(union_of(&["A".into(), "B".into(), "A".into()]), "A | B");
        assert_eq!(intersection_of(&["A".into(), "B | C".into()]), "A & (B | C)");
    }
}
