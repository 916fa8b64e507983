/// Minimal FITS codec: header cards, HDU walking, and binary tables.
///
/// Layout of the files this module reads and writes:
/// ```text
///  ┌──────────────────────┐
///  │ primary header        │  SIMPLE = T ... END, blank-padded to 2880
///  ├──────────────────────┤
///  │ primary data (opt.)   │  skipped, zero-padded to 2880
///  ├──────────────────────┤
///  │ XTENSION = 'BINTABLE' │  TTYPEn / TFORMn / TSCALn / TZEROn
///  ├──────────────────────┤
///  │ rows, big-endian      │  NAXIS2 rows × NAXIS1 bytes
///  └──────────────────────┘
/// ```
/// Only the first extension is ever looked at.
pub mod bintable;
pub mod header;

use std::io::{self, Write};

use thiserror::Error;

pub use bintable::{ColumnData, DecodedColumn, TForm, TypeCode};
pub use header::{Header, Value};

pub const BLOCK_SIZE: usize = 2880;
pub const CARD_SIZE: usize = 80;

#[derive(Error, Debug)]
pub enum FitsError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed FITS: {0}")]
    Malformed(String),

    #[error("missing required keyword {0}")]
    MissingKeyword(String),

    #[error("keyword {keyword} has unexpected value '{found}'")]
    BadKeyword { keyword: String, found: String },

    #[error("unsupported FITS content: {0}")]
    Unsupported(String),
}

/// Size in bytes of the primary HDU's data array, before padding.
fn primary_data_len(header: &Header) -> Result<usize, FitsError> {
    let naxis = header.size("NAXIS")?;
    if naxis == 0 {
        return Ok(0);
    }
    let bitpix = header.integer("BITPIX")?;
    let groups = matches!(header.get("GROUPS"), Some(Value::Logical(true)));

    let mut elements: usize = 1;
    for n in 1..=naxis {
        let len = header.size(&format!("NAXIS{n}"))?;
        // Random-groups files store NAXIS1 = 0.
        if groups && n == 1 && len == 0 {
            continue;
        }
        elements = elements
            .checked_mul(len)
            .ok_or_else(|| FitsError::Malformed("primary data size overflows".into()))?;
    }
    let pcount = usize::try_from(header.integer_or("PCOUNT", 0)?).unwrap_or(0);
    let gcount = usize::try_from(header.integer_or("GCOUNT", 1)?).unwrap_or(1);
    let bytes_per_element = (bitpix.unsigned_abs() / 8) as usize;

    pcount
        .checked_add(elements)
        .and_then(|n| n.checked_mul(gcount))
        .and_then(|n| n.checked_mul(bytes_per_element))
        .ok_or_else(|| FitsError::Malformed("primary data size overflows".into()))
}

/// Decode the first extension after the primary HDU, which must be a
/// BINTABLE.  Returns its columns in stored order, each flattened.
pub fn read_first_table(bytes: &[u8]) -> Result<Vec<DecodedColumn>, FitsError> {
    if !bytes.starts_with(b"SIMPLE  =") {
        return Err(FitsError::Malformed(
            "file does not start with a SIMPLE card".into(),
        ));
    }
    let (primary, data_start) = Header::parse(bytes, 0)?;
    let ext_start = header::checked_padded_len(primary_data_len(&primary)?)
        .and_then(|len| data_start.checked_add(len))
        .ok_or_else(|| FitsError::Malformed("primary data size overflows".into()))?;
    if ext_start >= bytes.len() {
        return Err(FitsError::Unsupported(
            "file has no extension after the primary HDU".into(),
        ));
    }

    let (ext, table_start) = Header::parse(bytes, ext_start)?;
    match ext.string("XTENSION") {
        Some("BINTABLE") => {}
        Some(other) => {
            return Err(FitsError::Unsupported(format!(
                "first extension is '{other}', expected 'BINTABLE'"
            )))
        }
        None => return Err(FitsError::MissingKeyword("XTENSION".into())),
    }

    bintable::decode(&ext, bytes.get(table_start..).unwrap_or(&[]))
}

/// Write an empty primary HDU followed by one BINTABLE holding `columns`.
pub fn write_table<W: Write>(out: &mut W, columns: &[ColumnData<'_>]) -> Result<(), FitsError> {
    let mut primary = Header::new();
    primary.push("SIMPLE", Value::Logical(true));
    primary.push("BITPIX", Value::Integer(8));
    primary.push("NAXIS", Value::Integer(0));
    primary.push("EXTEND", Value::Logical(true));

    // Validate the columns before anything reaches `out`.
    let mut table = Vec::new();
    bintable::encode(&mut table, columns)?;

    out.write_all(&primary.to_bytes())?;
    out.write_all(&table)?;
    out.flush()?;
    Ok(())
}
