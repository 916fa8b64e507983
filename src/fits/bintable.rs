use std::io::Write;

use super::header::{padded_len, Header, Value};
use super::FitsError;

// ---------------------------------------------------------------------------
// TFORM – per-column storage format
// ---------------------------------------------------------------------------

/// Binary table field type codes (the letter in `TFORMn`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCode {
    Logical,
    Bit,
    UInt8,
    Int16,
    Int32,
    Int64,
    Char,
    Float32,
    Float64,
    Complex32,
    Complex64,
    ArrayDesc32,
    ArrayDesc64,
}

impl TypeCode {
    fn from_letter(c: char) -> Option<TypeCode> {
        Some(match c {
            'L' => TypeCode::Logical,
            'X' => TypeCode::Bit,
            'B' => TypeCode::UInt8,
            'I' => TypeCode::Int16,
            'J' => TypeCode::Int32,
            'K' => TypeCode::Int64,
            'A' => TypeCode::Char,
            'E' => TypeCode::Float32,
            'D' => TypeCode::Float64,
            'C' => TypeCode::Complex32,
            'M' => TypeCode::Complex64,
            'P' => TypeCode::ArrayDesc32,
            'Q' => TypeCode::ArrayDesc64,
            _ => return None,
        })
    }

    fn letter(self) -> char {
        match self {
            TypeCode::Logical => 'L',
            TypeCode::Bit => 'X',
            TypeCode::UInt8 => 'B',
            TypeCode::Int16 => 'I',
            TypeCode::Int32 => 'J',
            TypeCode::Int64 => 'K',
            TypeCode::Char => 'A',
            TypeCode::Float32 => 'E',
            TypeCode::Float64 => 'D',
            TypeCode::Complex32 => 'C',
            TypeCode::Complex64 => 'M',
            TypeCode::ArrayDesc32 => 'P',
            TypeCode::ArrayDesc64 => 'Q',
        }
    }

    /// Bytes per element.  Bits are handled separately in [`TForm::width`].
    fn element_size(self) -> usize {
        match self {
            TypeCode::Logical | TypeCode::UInt8 | TypeCode::Char | TypeCode::Bit => 1,
            TypeCode::Int16 => 2,
            TypeCode::Int32 | TypeCode::Float32 => 4,
            TypeCode::Int64
            | TypeCode::Float64
            | TypeCode::Complex32
            | TypeCode::ArrayDesc32 => 8,
            TypeCode::Complex64 | TypeCode::ArrayDesc64 => 16,
        }
    }

    fn is_numeric(self) -> bool {
        matches!(
            self,
            TypeCode::Logical
                | TypeCode::UInt8
                | TypeCode::Int16
                | TypeCode::Int32
                | TypeCode::Int64
                | TypeCode::Float32
                | TypeCode::Float64
        )
    }
}

/// A parsed `TFORMn` value: repeat count plus type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TForm {
    pub repeat: usize,
    pub code: TypeCode,
}

impl TForm {
    pub fn new(repeat: usize, code: TypeCode) -> Self {
        TForm { repeat, code }
    }

    pub fn scalar(code: TypeCode) -> Self {
        TForm::new(1, code)
    }

    /// Parse `rT…`; anything after the type letter (e.g. `PE(100)`) is ignored.
    pub fn parse(text: &str) -> Result<TForm, FitsError> {
        let text = text.trim();
        let digits = text.chars().take_while(|c| c.is_ascii_digit()).count();
        let repeat = if digits == 0 {
            1
        } else {
            text[..digits]
                .parse()
                .map_err(|_| FitsError::Malformed(format!("bad repeat count in TFORM '{text}'")))?
        };
        let letter = text[digits..]
            .chars()
            .next()
            .ok_or_else(|| FitsError::Malformed(format!("TFORM '{text}' has no type code")))?;
        let code = TypeCode::from_letter(letter.to_ascii_uppercase())
            .ok_or_else(|| FitsError::Malformed(format!("unknown TFORM type code in '{text}'")))?;
        let form = TForm { repeat, code };
        form.width()?;
        Ok(form)
    }

    /// Bytes this field occupies in one row.
    pub fn width(&self) -> Result<usize, FitsError> {
        match self.code {
            TypeCode::Bit => Ok(self.repeat.div_ceil(8)),
            TypeCode::ArrayDesc32 | TypeCode::ArrayDesc64 => Ok(self.code.element_size()),
            code => code.element_size().checked_mul(self.repeat).ok_or_else(|| {
                FitsError::Malformed(format!("TFORM '{}' is too wide", self.to_tform()))
            }),
        }
    }

    pub fn to_tform(&self) -> String {
        if self.repeat == 1 {
            self.code.letter().to_string()
        } else {
            format!("{}{}", self.repeat, self.code.letter())
        }
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// One decoded column, already flattened across rows.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedColumn {
    pub name: String,
    pub repeat: usize,
    pub values: Vec<f64>,
}

struct FieldLayout {
    name: String,
    form: TForm,
    offset: usize,
    scale: f64,
    zero: f64,
}

/// Decode the BINTABLE described by `header` from `data` (the bytes right
/// after the header).  Vector cells are concatenated row after row.
pub fn decode(header: &Header, data: &[u8]) -> Result<Vec<DecodedColumn>, FitsError> {
    let row_len = header.size("NAXIS1")?;
    let n_rows = header.size("NAXIS2")?;
    let n_fields = header.size("TFIELDS")?;

    let mut fields = Vec::new();
    let mut offset: usize = 0;
    for n in 1..=n_fields {
        let tform = header
            .string(&format!("TFORM{n}"))
            .ok_or_else(|| FitsError::MissingKeyword(format!("TFORM{n}")))?;
        let form = TForm::parse(tform)?;
        let name = header
            .string(&format!("TTYPE{n}"))
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("col{n}"));

        if !form.code.is_numeric() {
            return Err(FitsError::Unsupported(format!(
                "column '{name}' has TFORM '{tform}', which is not a fixed numeric type"
            )));
        }

        fields.push(FieldLayout {
            name,
            form,
            offset,
            scale: header.float_or(&format!("TSCAL{n}"), 1.0)?,
            zero: header.float_or(&format!("TZERO{n}"), 0.0)?,
        });
        offset = offset
            .checked_add(form.width()?)
            .ok_or_else(|| FitsError::Malformed("row width overflows".into()))?;
    }

    if offset > row_len {
        return Err(FitsError::Malformed(format!(
            "columns need {offset} bytes per row but NAXIS1 is {row_len}"
        )));
    }
    let table_len = row_len
        .checked_mul(n_rows)
        .ok_or_else(|| FitsError::Malformed("table size overflows".into()))?;
    if data.len() < table_len {
        return Err(FitsError::Malformed(format!(
            "table data is truncated: expected {table_len} bytes, found {}",
            data.len()
        )));
    }

    // Every field fits inside a row and every row inside `data`, so the
    // slicing below stays in bounds.
    fields
        .into_iter()
        .map(|field| {
            let size = field.form.code.element_size();
            let width = field.form.width()?;
            let mut values = Vec::with_capacity(n_rows * field.form.repeat);
            for row in 0..n_rows {
                let start = row * row_len + field.offset;
                for raw in data[start..start + width].chunks_exact(size) {
                    let v = decode_element(field.form.code, raw);
                    values.push(v * field.scale + field.zero);
                }
            }
            Ok(DecodedColumn {
                name: field.name,
                repeat: field.form.repeat,
                values,
            })
        })
        .collect()
}

fn decode_element(code: TypeCode, raw: &[u8]) -> f64 {
    match code {
        TypeCode::Logical => {
            if raw[0] == b'T' {
                1.0
            } else {
                0.0
            }
        }
        TypeCode::UInt8 => raw[0] as f64,
        TypeCode::Int16 => i16::from_be_bytes([raw[0], raw[1]]) as f64,
        TypeCode::Int32 => i32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as f64,
        TypeCode::Int64 => {
            let mut b = [0u8; 8];
            b.copy_from_slice(raw);
            i64::from_be_bytes(b) as f64
        }
        TypeCode::Float32 => f32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as f64,
        TypeCode::Float64 => {
            let mut b = [0u8; 8];
            b.copy_from_slice(raw);
            f64::from_be_bytes(b)
        }
        // Rejected before decoding starts.
        _ => f64::NAN,
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// A column to write: `values.len()` must be `rows * form.repeat`.
#[derive(Debug, Clone, Copy)]
pub struct ColumnData<'a> {
    pub name: &'a str,
    pub form: TForm,
    pub values: &'a [f64],
}

/// Bytes per row for `columns`.
fn row_width(columns: &[ColumnData<'_>]) -> Result<usize, FitsError> {
    columns.iter().try_fold(0usize, |acc, c| {
        acc.checked_add(c.form.width()?)
            .ok_or_else(|| FitsError::Malformed("row width overflows".into()))
    })
}

/// Build the BINTABLE header for `columns` with `n_rows` rows of `row_len` bytes.
fn table_header(columns: &[ColumnData<'_>], n_rows: usize, row_len: usize) -> Header {
    let mut header = Header::new();
    header.push("XTENSION", Value::Str("BINTABLE".into()));
    header.push("BITPIX", Value::Integer(8));
    header.push("NAXIS", Value::Integer(2));
    header.push("NAXIS1", Value::Integer(row_len as i64));
    header.push("NAXIS2", Value::Integer(n_rows as i64));
    header.push("PCOUNT", Value::Integer(0));
    header.push("GCOUNT", Value::Integer(1));
    header.push("TFIELDS", Value::Integer(columns.len() as i64));
    for (i, col) in columns.iter().enumerate() {
        let n = i + 1;
        header.push(&format!("TTYPE{n}"), Value::Str(col.name.to_string()));
        header.push(&format!("TFORM{n}"), Value::Str(col.form.to_tform()));
    }
    header
}

/// Row count implied by the columns; every column must agree.
fn row_count(columns: &[ColumnData<'_>]) -> Result<usize, FitsError> {
    let mut rows: Option<usize> = None;
    for col in columns {
        if !col.form.code.is_numeric() || col.form.repeat == 0 {
            return Err(FitsError::Unsupported(format!(
                "cannot encode column '{}' as TFORM '{}'",
                col.name,
                col.form.to_tform()
            )));
        }
        if col.values.len() % col.form.repeat != 0 {
            return Err(FitsError::Malformed(format!(
                "column '{}' has {} values, not a multiple of its repeat count {}",
                col.name,
                col.values.len(),
                col.form.repeat
            )));
        }
        let n = col.values.len() / col.form.repeat;
        match rows {
            None => rows = Some(n),
            Some(r) if r != n => {
                return Err(FitsError::Malformed(format!(
                    "column '{}' has {n} rows, expected {r}",
                    col.name
                )))
            }
            Some(_) => {}
        }
    }
    Ok(rows.unwrap_or(0))
}

fn encode_element(code: TypeCode, v: f64, out: &mut Vec<u8>) {
    match code {
        TypeCode::Logical => out.push(if v != 0.0 { b'T' } else { b'F' }),
        TypeCode::UInt8 => out.push(v as u8),
        TypeCode::Int16 => out.extend_from_slice(&(v as i16).to_be_bytes()),
        TypeCode::Int32 => out.extend_from_slice(&(v as i32).to_be_bytes()),
        TypeCode::Int64 => out.extend_from_slice(&(v as i64).to_be_bytes()),
        TypeCode::Float32 => out.extend_from_slice(&(v as f32).to_be_bytes()),
        TypeCode::Float64 => out.extend_from_slice(&v.to_be_bytes()),
        // Rejected by `row_count`.
        _ => {}
    }
}

/// Write the table HDU (header, rows, zero padding) to `out`.
pub fn encode<W: Write>(out: &mut W, columns: &[ColumnData<'_>]) -> Result<(), FitsError> {
    let n_rows = row_count(columns)?;
    let row_len = row_width(columns)?;
    out.write_all(&table_header(columns, n_rows, row_len).to_bytes())?;

    let mut row = Vec::with_capacity(row_len);
    for r in 0..n_rows {
        row.clear();
        for col in columns {
            let start = r * col.form.repeat;
            for &v in &col.values[start..start + col.form.repeat] {
                encode_element(col.form.code, v, &mut row);
            }
        }
        out.write_all(&row)?;
    }

    let data_len = row_len * n_rows;
    let padding = padded_len(data_len) - data_len;
    out.write_all(&vec![0u8; padding])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fits::BLOCK_SIZE;

    #[test]
    fn tform_parsing() {
        assert_eq!(TForm::parse("E").unwrap(), TForm::scalar(TypeCode::Float32));
        assert_eq!(
            TForm::parse("1024D").unwrap(),
            TForm::new(1024, TypeCode::Float64)
        );
        assert_eq!(
            TForm::parse("1PE(100)").unwrap(),
            TForm::new(1, TypeCode::ArrayDesc32)
        );
        assert_eq!(TForm::parse("12X").unwrap().width().unwrap(), 2);
        assert_eq!(TForm::parse("3J").unwrap().width().unwrap(), 12);
        assert!(TForm::parse("12").is_err());
        assert!(TForm::parse("2Z").is_err());
        assert_eq!(TForm::new(4, TypeCode::Int16).to_tform(), "4I");
    }

    fn encode_to_vec(columns: &[ColumnData<'_>]) -> Vec<u8> {
        let mut buf = Vec::new();
        encode(&mut buf, columns).unwrap();
        buf
    }

    #[test]
    fn encoded_table_decodes_back() {
        let wave = [400.0, 401.0, 402.0, 403.0, 404.0, 405.0];
        let qual = [0.0, 1.0];
        let columns = [
            ColumnData {
                name: "WAVE",
                form: TForm::new(3, TypeCode::Float64),
                values: &wave,
            },
            ColumnData {
                name: "QUAL",
                form: TForm::scalar(TypeCode::Int32),
                values: &qual,
            },
        ];
        let bytes = encode_to_vec(&columns);
        assert_eq!(bytes.len() % BLOCK_SIZE, 0);

        let (header, data_start) = Header::parse(&bytes, 0).unwrap();
        assert_eq!(header.size("NAXIS1").unwrap(), 28);
        assert_eq!(header.size("NAXIS2").unwrap(), 2);

        let decoded = decode(&header, &bytes[data_start..]).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].name, "WAVE");
        assert_eq!(decoded[0].repeat, 3);
        assert_eq!(decoded[0].values, wave.to_vec());
        assert_eq!(decoded[1].values, qual.to_vec());
    }

    #[test]
    fn applies_scaling_and_default_names() {
        let mut header = Header::new();
        header.push("XTENSION", Value::Str("BINTABLE".into()));
        header.push("NAXIS1", Value::Integer(2));
        header.push("NAXIS2", Value::Integer(2));
        header.push("TFIELDS", Value::Integer(1));
        header.push("TFORM1", Value::Str("I".into()));
        header.push("TSCAL1", Value::Float(0.5));
        header.push("TZERO1", Value::Integer(32768));

        let data = [0x80u8, 0x00, 0x00, 0x02];
        let decoded = decode(&header, &data).unwrap();
        assert_eq!(decoded[0].name, "col1");
        assert_eq!(decoded[0].values, vec![-16384.0 + 32768.0, 1.0 + 32768.0]);
    }

    #[test]
    fn truncated_data_is_rejected() {
        let values = [1.0, 2.0, 3.0];
        let columns = [ColumnData {
            name: "FLUX",
            form: TForm::scalar(TypeCode::Float32),
            values: &values,
        }];
        let bytes = encode_to_vec(&columns);
        let (header, data_start) = Header::parse(&bytes, 0).unwrap();
        let err = decode(&header, &bytes[data_start..data_start + 8]).unwrap_err();
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn rejects_string_and_variable_length_columns() {
        let mut header = Header::new();
        header.push("NAXIS1", Value::Integer(16));
        header.push("NAXIS2", Value::Integer(0));
        header.push("TFIELDS", Value::Integer(2));
        header.push("TTYPE1", Value::Str("OBJECT".into()));
        header.push("TFORM1", Value::Str("8A".into()));
        header.push("TFORM2", Value::Str("1PE(10)".into()));
        let err = decode(&header, &[]).unwrap_err();
        assert!(matches!(err, FitsError::Unsupported(ref m) if m.contains("OBJECT")));
    }

    #[test]
    fn oversized_repeat_count_is_malformed() {
        // 2^61 + 1 doubles: the repeat count parses but its byte width does not fit.
        assert!(matches!(
            TForm::parse("2305843009213693953D"),
            Err(FitsError::Malformed(ref m)) if m.contains("too wide")
        ));

        let mut header = Header::new();
        header.push("NAXIS1", Value::Integer(8));
        header.push("NAXIS2", Value::Integer(1));
        header.push("TFIELDS", Value::Integer(1));
        header.push("TFORM1", Value::Str("2305843009213693953D".into()));
        let err = decode(&header, &[0u8; 8]).unwrap_err();
        assert!(matches!(err, FitsError::Malformed(_)));
    }

    #[test]
    fn summed_field_widths_must_not_overflow() {
        let big = usize::MAX / 8;
        let mut header = Header::new();
        header.push("NAXIS1", Value::Integer(8));
        header.push("NAXIS2", Value::Integer(1));
        header.push("TFIELDS", Value::Integer(2));
        header.push("TFORM1", Value::Str(format!("{big}D")));
        header.push("TFORM2", Value::Str(format!("{big}D")));
        let err = decode(&header, &[0u8; 8]).unwrap_err();
        assert!(matches!(err, FitsError::Malformed(ref m) if m.contains("overflows")));
    }

    #[test]
    fn huge_repeat_is_rejected_on_encode() {
        let columns = [ColumnData {
            name: "WIDE",
            form: TForm::new(usize::MAX, TypeCode::Float64),
            values: &[],
        }];
        let mut buf = Vec::new();
        assert!(matches!(
            encode(&mut buf, &columns),
            Err(FitsError::Malformed(_))
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn mismatched_rows_are_rejected_on_encode() {
        let a = [1.0, 2.0];
        let b = [1.0];
        let columns = [
            ColumnData {
                name: "A",
                form: TForm::scalar(TypeCode::Float32),
                values: &a,
            },
            ColumnData {
                name: "B",
                form: TForm::scalar(TypeCode::Float32),
                values: &b,
            },
        ];
        let mut buf = Vec::new();
        assert!(encode(&mut buf, &columns).is_err());
        assert!(buf.is_empty());
    }
}
