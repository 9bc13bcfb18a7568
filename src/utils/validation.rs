use crate::entities::TransactionKind;
use crate::error::{AppError, AppResult};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

pub const MIN_JUMLAH: i64 = 1_000;
pub const MAX_JUMLAH: i64 = 10_000_000;
pub const MAX_KETERANGAN: usize = 200;

static NIS_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4,20}$").unwrap());
static NAMA_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L} .'\-]{2,100}$").unwrap());

/// Tanggal hari ini menurut waktu lokal sekolah.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Input transaksi yang sudah lolos validasi.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidTransaction {
    pub jenis: TransactionKind,
    pub jumlah: i64,
    pub tanggal: NaiveDate,
    pub keterangan: Option<String>,
}

pub fn validate_jumlah(jumlah: i64) -> AppResult<()> {
    if jumlah < MIN_JUMLAH {
        return Err(AppError::ValidationError(format!(
            "Jumlah minimal Rp {MIN_JUMLAH}"
        )));
    }
    if jumlah > MAX_JUMLAH {
        return Err(AppError::ValidationError(format!(
            "Jumlah maksimal Rp {MAX_JUMLAH}"
        )));
    }
    Ok(())
}

pub fn validate_tanggal(tanggal: NaiveDate, today: NaiveDate) -> AppResult<()> {
    if tanggal > today {
        return Err(AppError::ValidationError(
            "Tanggal transaksi tidak boleh di masa depan".to_string(),
        ));
    }
    Ok(())
}

/// Menerima `YYYY-MM-DD` atau `DD/MM/YYYY`.
pub fn parse_tanggal(raw: &str) -> AppResult<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .map_err(|_| {
            AppError::ValidationError(format!(
                "Format tanggal tidak valid: {raw}. Gunakan YYYY-MM-DD"
            ))
        })
}

/// Catatan kosong dianggap tidak ada.
pub fn validate_keterangan(keterangan: Option<String>) -> AppResult<Option<String>> {
    match keterangan {
        Some(k) if k.trim().is_empty() => Ok(None),
        Some(k) if k.chars().count() > MAX_KETERANGAN => Err(AppError::ValidationError(
            format!("Keterangan maksimal {MAX_KETERANGAN} karakter"),
        )),
        other => Ok(other),
    }
}

pub fn validate_transaction(
    jenis: TransactionKind,
    jumlah: i64,
    tanggal: NaiveDate,
    keterangan: Option<String>,
    today: NaiveDate,
) -> AppResult<ValidTransaction> {
    validate_jumlah(jumlah)?;
    validate_tanggal(tanggal, today)?;
    let keterangan = validate_keterangan(keterangan)?;
    Ok(ValidTransaction {
        jenis,
        jumlah,
        tanggal,
        keterangan,
    })
}

pub fn validate_nis(nis: &str) -> AppResult<()> {
    if !NIS_REGEX.is_match(nis) {
        return Err(AppError::ValidationError(
            "NIS harus berupa angka 4-20 digit".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_nama(nama: &str) -> AppResult<()> {
    if !NAMA_REGEX.is_match(nama) {
        return Err(AppError::ValidationError(
            "Nama harus 2-100 karakter dan hanya berisi huruf".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_nama_kelas(nama_kelas: &str) -> AppResult<()> {
    let len = nama_kelas.chars().count();
    if len == 0 || len > 50 {
        return Err(AppError::ValidationError(
            "Nama kelas harus 1-50 karakter".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    #[test]
    fn test_jumlah_boundaries() {
        assert!(validate_jumlah(999).is_err());
        assert!(validate_jumlah(1_000).is_ok());
        assert!(validate_jumlah(10_000_000).is_ok());
        assert!(validate_jumlah(10_000_001).is_err());
    }

    #[test]
    fn test_future_date_rejected_regardless_of_amount() {
        let tomorrow = NaiveDate::from_ymd_opt(2025, 3, 11).unwrap();
        for jumlah in [1_000, 50_000, 10_000_000] {
            assert!(
                validate_transaction(TransactionKind::Setor, jumlah, tomorrow, None, today())
                    .is_err()
            );
        }
        assert!(validate_transaction(TransactionKind::Setor, 1_000, today(), None, today()).is_ok());
    }

    #[test]
    fn test_keterangan() {
        assert_eq!(validate_keterangan(Some("  ".into())).unwrap(), None);
        assert!(validate_keterangan(Some("a".repeat(200))).is_ok());
        assert!(validate_keterangan(Some("a".repeat(201))).is_err());
    }

    #[test]
    fn test_parse_tanggal() {
        let expected = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        assert_eq!(parse_tanggal("2025-01-02").unwrap(), expected);
        assert_eq!(parse_tanggal("02/01/2025").unwrap(), expected);
        assert!(parse_tanggal("2025/13/45").is_err());
    }

    #[test]
    fn test_nis_and_nama() {
        assert!(validate_nis("12345").is_ok());
        assert!(validate_nis("12a45").is_err());
        assert!(validate_nis("123").is_err());
        assert!(validate_nama("Siti Nur'aini").is_ok());
        assert!(validate_nama("A").is_err());
        assert!(validate_nama("Budi<script>").is_err());
    }
}
