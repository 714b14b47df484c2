//! Text wrapping for console log lines.

/// Wraps each line of `text` at word boundaries so no line exceeds
/// `max_width` where possible. Leading indentation of a line is repeated on
/// its continuation lines; words longer than the width are left intact.
pub fn wrap_text(text: &str, max_width: usize) -> String {
    let mut out: Vec<String> = Vec::new();

    for line in text.lines() {
        if line.chars().count() <= max_width {
            out.push(line.to_string());
            continue;
        }

        let indent_len = line.len() - line.trim_start().len();
        let indent = &line[..indent_len];
        let mut current = indent.to_string();

        for word in line.split_whitespace() {
            let has_words = current.len() > indent_len;
            let projected = current.chars().count() + word.chars().count() + usize::from(has_words);
            if has_words && projected > max_width {
                out.push(std::mem::replace(&mut current, indent.to_string()));
            }
            if current.len() > indent_len {
                current.push(' ');
            }
            current.push_str(word);
        }

        if current.len() > indent_len {
            out.push(current);
        }
    }

    out.join("\n")
}
