use crate::textutil::count_non_empty_lines;

/// Outcome of comparing a translation's line count against its source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Completeness {
    pub source_lines: usize,
    pub translated_lines: usize,
    pub required_lines: usize,
}

impl Completeness {
    #[must_use]
    pub fn measure(source: &str, translated: &str, ratio: f64) -> Self {
        let source_lines = count_non_empty_lines(source);
        Self {
            source_lines,
            translated_lines: count_non_empty_lines(translated),
            required_lines: required_lines(source_lines, ratio),
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.translated_lines >= self.required_lines
    }
}

/// `ceil(source_lines * ratio)`, tolerant of float noise such as `10 * 0.7`.
#[must_use]
pub fn required_lines(source_lines: usize, ratio: f64) -> usize {
    let exact = source_lines as f64 * ratio;
    (exact - 1e-9).ceil().max(0.0) as usize
}

/// Advisory signals about an accepted translation. They are logged, never
/// used to reject an attempt.
#[derive(Clone, Debug, Default)]
pub struct QualityHeuristics {
    pub flags: Vec<String>,
    pub src_chars: usize,
    pub tgt_chars: usize,
    pub len_ratio: f32,
    pub hangul_ratio: f32,
    pub han_ratio: f32,
    pub latin_alpha_ratio: f32,
}

impl QualityHeuristics {
    #[must_use]
    pub fn render_line(&self) -> String {
        format!(
            "src_chars={} tgt_chars={} ratio={:.2} hangul={:.2} han={:.2} latin={:.2} flags=[{}]",
            self.src_chars,
            self.tgt_chars,
            self.len_ratio,
            self.hangul_ratio,
            self.han_ratio,
            self.latin_alpha_ratio,
            self.flags.join(" | ")
        )
    }
}

#[must_use]
pub fn quality_heuristics(source: &str, translated: &str) -> QualityHeuristics {
    let src = text_metrics(source);
    let tgt = text_metrics(translated);
    let ratio = |n: usize, d: usize| if d == 0 { 0.0 } else { n as f32 / d as f32 };

    let len_ratio = ratio(tgt.non_ws, src.non_ws);
    let hangul_ratio = ratio(tgt.hangul, tgt.non_ws);
    let han_ratio = ratio(tgt.han, tgt.non_ws);
    let kana_ratio = ratio(tgt.jp_kana, tgt.non_ws);
    let latin_alpha_ratio = ratio(tgt.latin_alpha, tgt.non_ws);

    let mut flags = Vec::new();
    if tgt.non_ws >= 20 {
        if hangul_ratio > 0.20 {
            flags.push("target_contains_much_hangul".to_string());
        }
        if han_ratio + kana_ratio > 0.20 {
            flags.push("target_contains_much_cjk".to_string());
        }
        if latin_alpha_ratio < 0.18 {
            flags.push("target_script_missing_latin".to_string());
        }
    }
    if src.non_ws >= 40 && len_ratio > 0.0 && len_ratio < 0.35 {
        flags.push("len_ratio_too_short".to_string());
    }

    QualityHeuristics {
        flags,
        src_chars: src.non_ws,
        tgt_chars: tgt.non_ws,
        len_ratio,
        hangul_ratio,
        han_ratio,
        latin_alpha_ratio,
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct TextMetrics {
    non_ws: usize,
    han: usize,
    latin_alpha: usize,
    jp_kana: usize,
    hangul: usize,
}

fn text_metrics(text: &str) -> TextMetrics {
    let mut m = TextMetrics::default();
    for ch in text.chars() {
        if ch.is_whitespace() {
            continue;
        }
        m.non_ws = m.non_ws.saturating_add(1);
        if ch.is_ascii_alphabetic() {
            m.latin_alpha = m.latin_alpha.saturating_add(1);
        }
        if is_han(ch) {
            m.han = m.han.saturating_add(1);
        } else if is_jp_kana(ch) {
            m.jp_kana = m.jp_kana.saturating_add(1);
        } else if is_hangul(ch) {
            m.hangul = m.hangul.saturating_add(1);
        }
    }
    m
}

fn is_han(ch: char) -> bool {
    let u = ch as u32;
    (0x3400..=0x4DBF).contains(&u)
        || (0x4E00..=0x9FFF).contains(&u)
        || (0xF900..=0xFAFF).contains(&u)
        || (0x20000..=0x2A6DF).contains(&u)
}

fn is_jp_kana(ch: char) -> bool {
    let u = ch as u32;
    (0x3040..=0x309F).contains(&u) || (0x30A0..=0x30FF).contains(&u)
}

fn is_hangul(ch: char) -> bool {
    let u = ch as u32;
    (0xAC00..=0xD7AF).contains(&u) || (0x1100..=0x11FF).contains(&u) || (0x3130..=0x318F).contains(&u)
}
