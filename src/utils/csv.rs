use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static AMOUNT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d+|\d{1,3}(?:[.,]\d{3})+)$").unwrap());

/// Memecah satu baris CSV; mendukung field bertanda kutip dan `""`.
pub fn parse_csv_record(line: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                buf.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' | ';' if !in_quotes => out.push(std::mem::take(&mut buf)),
            _ => buf.push(ch),
        }
    }
    out.push(buf);
    out
}

pub fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

pub fn csv_line(fields: &[String]) -> String {
    let quoted: Vec<String> = fields.iter().map(|f| csv_quote(f)).collect();
    quoted.join(",")
}

/// Isi CSV yang sudah dipecah: header (huruf kecil) dan baris data
/// beserta nomor barisnya di file.
#[derive(Debug)]
pub struct CsvTable {
    columns: HashMap<String, usize>,
    pub rows: Vec<(usize, Vec<String>)>,
}

impl CsvTable {
    pub fn parse(text: &str) -> Self {
        let text = text.trim_start_matches('\u{feff}');
        let mut lines = text.lines().enumerate();
        let mut columns = HashMap::new();
        if let Some((_, header)) = lines.next() {
            for (i, name) in parse_csv_record(header).into_iter().enumerate() {
                columns.insert(name.trim().to_ascii_lowercase(), i);
            }
        }
        let rows = lines
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| (idx + 1, parse_csv_record(line)))
            .collect();
        Self { columns, rows }
    }

    /// Indeks kolom untuk salah satu nama alternatif.
    pub fn column(&self, names: &[&str]) -> Option<usize> {
        names
            .iter()
            .find_map(|n| self.columns.get(&n.to_ascii_lowercase()).copied())
    }

    pub fn field<'a>(row: &'a [String], col: Option<usize>) -> &'a str {
        col.and_then(|c| row.get(c)).map(|s| s.trim()).unwrap_or("")
    }
}

/// Jumlah rupiah bulat, boleh dengan pemisah ribuan (`50.000`, `50,000`,
/// `Rp 50.000`). Tanda minus dan pecahan ditolak.
pub fn parse_amount(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    let number = trimmed
        .strip_prefix("Rp")
        .or_else(|| trimmed.strip_prefix("rp"))
        .or_else(|| trimmed.strip_prefix("RP"))
        .unwrap_or(trimmed)
        .trim();
    if !AMOUNT_REGEX.is_match(number) {
        return None;
    }
    number
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .ok()
}
