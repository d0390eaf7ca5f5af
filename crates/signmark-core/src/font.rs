//! Helvetica metrics and WinAnsi encoding for flattened text

/// Advance widths (1/1000 em) for WinAnsi codes 32..=126 from the standard Helvetica AFM
const ASCII_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0-9
    278, 278, 584, 584, 584, 556, 1015, // :..@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A-M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N-Z
    278, 278, 278, 469, 556, 333, // [..`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a-m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n-z
    334, 260, 334, 584, // {..~
];

/// Widths for WinAnsi codes 128..=255; unassigned codes carry the bullet width
const HIGH_WIDTHS: [u16; 128] = [
    556, 350, 222, 556, 333, 1000, 556, 556, 333, 1000, 667, 333, 1000, 350, 611, 350, // 0x80
    350, 222, 222, 333, 333, 350, 556, 1000, 333, 1000, 500, 333, 944, 350, 500, 667, // 0x90
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333, // 0xA0
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611, // 0xB0
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278, // 0xC0
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611, // 0xD0
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278, // 0xE0
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500, // 0xF0
];

/// Characters WinAnsi places in 0x80..=0x9F, where it departs from Latin-1
const WIN_ANSI_EXTRAS: [(char, u8); 27] = [
    ('€', 0x80),
    ('‚', 0x82),
    ('ƒ', 0x83),
    ('„', 0x84),
    ('…', 0x85),
    ('†', 0x86),
    ('‡', 0x87),
    ('ˆ', 0x88),
    ('‰', 0x89),
    ('Š', 0x8A),
    ('‹', 0x8B),
    ('Œ', 0x8C),
    ('Ž', 0x8E),
    ('‘', 0x91),
    ('’', 0x92),
    ('“', 0x93),
    ('”', 0x94),
    ('•', 0x95),
    ('–', 0x96),
    ('—', 0x97),
    ('˜', 0x98),
    ('™', 0x99),
    ('š', 0x9A),
    ('›', 0x9B),
    ('œ', 0x9C),
    ('ž', 0x9E),
    ('Ÿ', 0x9F),
];

/// Glyph substituted for anything the font cannot encode
pub const REPLACEMENT: char = '?';

/// WinAnsi code for a character, if the standard font has a glyph for it
pub fn win_ansi(c: char) -> Option<u8> {
    match c as u32 {
        0x20..=0x7E | 0xA0..=0xFF => Some(c as u32 as u8),
        _ => WIN_ANSI_EXTRAS
            .iter()
            .find(|(extra, _)| *extra == c)
            .map(|(_, code)| *code),
    }
}

/// Map a string into what the standard font can show. Line breaks survive,
/// tabs become spaces and anything unencodable becomes [`REPLACEMENT`].
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\n' | '\r' => c,
            '\t' => ' ',
            _ if win_ansi(c).is_some() => c,
            _ => REPLACEMENT,
        })
        .collect()
}

/// Bytes for a `Tj` string under `/WinAnsiEncoding`
pub fn encode(line: &str) -> Vec<u8> {
    line.chars()
        .map(|c| win_ansi(c).unwrap_or(REPLACEMENT as u8))
        .collect()
}

fn code_width(code: u8) -> u16 {
    match code {
        32..=126 => ASCII_WIDTHS[(code - 32) as usize],
        128..=255 => HIGH_WIDTHS[(code - 128) as usize],
        _ => ASCII_WIDTHS[(REPLACEMENT as u8 - 32) as usize],
    }
}

fn char_width(c: char) -> u16 {
    code_width(win_ansi(c).unwrap_or(REPLACEMENT as u8))
}

/// Rendered width of `text` at `size` points
pub fn text_width(text: &str, size: f64) -> f64 {
    text.chars().map(|c| char_width(c) as f64).sum::<f64>() * size / 1000.0
}

/// Break text into lines no wider than `max_width`.
///
/// Explicit newlines always break. Words wrap at spaces; a single word wider
/// than the limit gets a line to itself rather than being split.
pub fn wrap(text: &str, size: f64, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim_end_matches('\r');
        let mut line = String::new();
        for word in paragraph.split(' ') {
            if line.is_empty() {
                line.push_str(word);
                continue;
            }
            let candidate = format!("{} {}", line, word);
            if text_width(&candidate, size) <= max_width {
                line = candidate;
            } else {
                lines.push(std::mem::take(&mut line));
                line.push_str(word);
            }
        }
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_known_widths() {
        assert_eq!(char_width(' '), 278);
        assert_eq!(char_width('@'), 1015);
        assert_eq!(char_width('W'), 944);
        assert_eq!(char_width('i'), 222);
        assert_eq!(char_width('~'), 584);
        assert_eq!(char_width('é'), 556);
        assert_eq!(char_width('Æ'), 1000);
        assert_eq!(char_width('€'), 556);
        // "Hi" = 722 + 222
        assert!((text_width("Hi", 12.0) - 11.328).abs() < 1e-9);
    }

    #[test]
    fn test_win_ansi_codes() {
        assert_eq!(win_ansi('A'), Some(b'A'));
        assert_eq!(win_ansi('é'), Some(0xE9));
        assert_eq!(win_ansi('ñ'), Some(0xF1));
        assert_eq!(win_ansi('€'), Some(0x80));
        assert_eq!(win_ansi('“'), Some(0x93));
        assert_eq!(win_ansi('\u{0085}'), None);
        assert_eq!(win_ansi('漢'), None);
    }

    #[test]
    fn test_sanitize_keeps_latin_and_line_breaks() {
        assert_eq!(sanitize("José\tMüller\n漢"), "José Müller\n?");
    }

    #[test]
    fn test_encode_writes_single_bytes() {
        assert_eq!(encode("José"), vec![b'J', b'o', b's', 0xE9]);
        assert_eq!(encode("5€"), vec![b'5', 0x80]);
    }

    #[test]
    fn test_short_text_is_one_line() {
        assert_eq!(wrap("Hi", 12.0, 172.0), vec!["Hi".to_string()]);
    }

    #[test]
    fn test_wraps_at_word_boundaries() {
        let lines = wrap("the quick brown fox jumps over the lazy dog", 12.0, 100.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, 12.0) <= 100.0 || !line.contains(' '));
        }
        assert_eq!(lines.join(" "), "the quick brown fox jumps over the lazy dog");
    }

    #[test]
    fn test_newlines_always_break() {
        assert_eq!(
            wrap("a\nb\n\nc", 12.0, 500.0),
            vec!["a", "b", "", "c"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_newlines_survive_sanitize() {
        assert_eq!(wrap(&sanitize("Jane\r\nDoe"), 12.0, 500.0), vec!["Jane", "Doe"]);
    }

    #[test]
    fn test_long_word_gets_own_line() {
        let lines = wrap("x Supercalifragilistic y", 12.0, 30.0);
        assert_eq!(lines, vec!["x", "Supercalifragilistic", "y"]);
    }
}
