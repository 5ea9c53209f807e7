use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Split a comma separated column list, dropping blanks.
pub fn parse_column_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|column| !column.is_empty())
        .map(str::to_string)
        .collect()
}

/// Cut `text` so it occupies at most `max_width` terminal cells, marking the cut with `…`.
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }

    let mut result = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > max_width {
            break;
        }
        result.push(ch);
        used += w;
    }
    result.push('…');
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_and_trims_columns() {
        assert_eq!(
            parse_column_list("Stkcd, ShortName,,Accper "),
            vec!["Stkcd", "ShortName", "Accper"]
        );
        assert!(parse_column_list(" , ").is_empty());
    }

    #[test]
    fn truncates_wide_text_by_cells() {
        assert_eq!(truncate_to_width("平安银行股份", 7), "平安银…");
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("abcdef", 4), "abc…");
    }
}
