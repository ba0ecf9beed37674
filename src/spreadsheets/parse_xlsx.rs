// src/spreadsheets/parse_xlsx.rs
//! Workbook -> `ParsedExcel`.
//!
//! Sheets are recognised by their header row, never by position:
//! a price sheet has locality, street and price columns; a coefficient sheet
//! has code and coefficient columns. Which coefficient axis a sheet feeds is
//! decided by its range columns (width, area, depth) and otherwise by the
//! sheet name.
use crate::errors::ServerError;
use crate::import::parsed::{
    ParsedCoefficient, ParsedExcel, ParsedSegment, DEFAULT_SEGMENT_FROM, DEFAULT_SEGMENT_TO,
};
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use serde::Serialize;
use std::io::Cursor;

const PREVIEW_ROWS: usize = 10;

// Column aliases, compared against lower-cased header text.
const LOCALITY: &[&str] = &["địa phương", "dia_phuong", "locality", "ward", "xã", "phường"];
const STREET: &[&str] = &["tên đường", "đường", "street", "street_name", "ten_duong"];
const SEGMENT_FROM: &[&str] = &["từ", "đoạn từ", "from", "segment_from", "tu"];
const SEGMENT_TO: &[&str] = &["đến", "đoạn đến", "to", "segment_to", "den"];
const PRICE_MIN: &[&str] = &["giá min", "giá tối thiểu", "base_price_min", "gia_min", "price_min"];
const PRICE_MAX: &[&str] = &["giá max", "giá tối đa", "base_price_max", "gia_max", "price_max"];
const GOVERNMENT_PRICE: &[&str] = &["giá nhà nước", "giá nn", "government_price", "gia_nn"];
const ADJ_COEF_MIN: &[&str] = &["hệ số min", "hs min", "adjustment_coef_min", "coef_min"];
const ADJ_COEF_MAX: &[&str] = &["hệ số max", "hs max", "adjustment_coef_max", "coef_max"];

const CODE: &[&str] = &["mã", "code", "ma"];
const COEFFICIENT: &[&str] = &["hệ số", "coefficient", "he_so"];
const DESCRIPTION: &[&str] = &["mô tả", "description", "mo_ta"];
const NAME: &[&str] = &["tên", "name", "ten"];
const LAND_TYPE_NAME: &[&str] = &["tên", "loại đất", "name", "ten"];
const LOCATION_NAME: &[&str] = &["tên", "vị trí", "name", "ten"];
const WIDTH_MIN: &[&str] = &["độ rộng min", "width_min", "do_rong_min"];
const WIDTH_MAX: &[&str] = &["độ rộng max", "width_max", "do_rong_max"];
const AREA_MIN: &[&str] = &["diện tích min", "area_min", "dien_tich_min"];
const AREA_MAX: &[&str] = &["diện tích max", "area_max", "dien_tich_max"];
const DEPTH_MIN: &[&str] = &["chiều sâu min", "depth_min", "chieu_sau_min"];
const DEPTH_MAX: &[&str] = &["chiều sâu max", "depth_max", "chieu_sau_max"];

// Defaults for open-ended ranges.
const WIDTH_MAX_DEFAULT: f64 = 999.0;
const AREA_MAX_DEFAULT: f64 = 99_999.0;
const DEPTH_MAX_DEFAULT: f64 = 999.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetKind {
    Prices,
    Coefficients,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    LandType,
    Location,
    Area,
    Depth,
    FengShui,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetPreview {
    pub name: String,
    pub kind: SheetKind,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub row_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcelPreview {
    pub sheets: Vec<SheetPreview>,
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// One worksheet reduced to a header row and its non-blank data rows.
struct Sheet {
    name: String,
    headers: Vec<String>,
    lower: Vec<String>,
    /// (excel row number, cells)
    rows: Vec<(u32, Vec<Data>)>,
}

impl Sheet {
    fn has_header(&self, pred: impl Fn(&str) -> bool) -> bool {
        self.lower.iter().any(|h| pred(h))
    }

    fn kind(&self) -> SheetKind {
        let prices = self.has_header(|h| h.contains("địa phương") || h.contains("dia_phuong"))
            && self.has_header(|h| h.contains("tên đường") || h.contains("đường") || h.contains("street"))
            && self.has_header(|h| h.contains("giá") || h.contains("price"));
        let coefficients = self.has_header(|h| h.contains("mã") || h == "code" || h == "ma")
            && self.has_header(|h| h.contains("hệ số") || h.contains("coefficient") || h.contains("he_so"));

        if prices {
            SheetKind::Prices
        } else if coefficients {
            SheetKind::Coefficients
        } else {
            SheetKind::Unknown
        }
    }

    fn axis(&self) -> Axis {
        if self.has_header(|h| h.contains("độ rộng") || h.contains("width")) {
            return Axis::Location;
        }
        if self.has_header(|h| h.contains("diện tích") && (h.contains("min") || h.contains("max"))) {
            return Axis::Area;
        }
        if self.has_header(|h| h.contains("chiều sâu") || h.contains("depth")) {
            return Axis::Depth;
        }

        let name = self.name.to_lowercase();
        if name.contains("phong thủy") || name.contains("feng") {
            Axis::FengShui
        } else {
            // "loại đất" / "land" and anything unrecognised
            Axis::LandType
        }
    }

    fn column(&self, aliases: &[&str]) -> Option<usize> {
        aliases
            .iter()
            .find_map(|alias| self.lower.iter().position(|h| h == alias))
    }
}

/// Cells of one data row, looked up through the sheet's header.
struct RowView<'a> {
    sheet: &'a Sheet,
    cells: &'a [Data],
}

impl RowView<'_> {
    fn text(&self, aliases: &[&str]) -> Option<String> {
        let cell = self.cells.get(self.sheet.column(aliases)?)?;
        cell_text(cell).filter(|s| !s.is_empty())
    }

    fn number(&self, aliases: &[&str]) -> Option<f64> {
        let cell = self.cells.get(self.sheet.column(aliases)?)?;
        match cell {
            Data::Float(n) => Some(*n),
            Data::Int(n) => Some(*n as f64),
            Data::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// A blank or zero cell takes the default.
    fn number_or(&self, aliases: &[&str], default: f64) -> f64 {
        self.number(aliases).filter(|n| *n != 0.0).unwrap_or(default)
    }
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => Some(s.trim().to_string()),
        Data::Float(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
        Data::Float(n) => Some(n.to_string()),
        Data::Int(n) => Some(n.to_string()),
        Data::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
        Data::DateTime(dt) => Some(dt.as_f64().to_string()),
        Data::Error(e) => Some(format!("#{e:?}")),
    }
}

fn cell_json(cell: &Data) -> serde_json::Value {
    match cell {
        Data::Empty => serde_json::Value::Null,
        Data::Float(n) => serde_json::json!(n),
        Data::Int(n) => serde_json::json!(n),
        Data::Bool(b) => serde_json::json!(b),
        other => serde_json::json!(cell_text(other).unwrap_or_default()),
    }
}

fn read_sheets(bytes: &[u8]) -> Result<Vec<Sheet>, ServerError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))
        .map_err(|e| ServerError::XlsxError(format!("Failed to open workbook: {e}")))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| ServerError::XlsxError(format!("Failed to read sheet '{name}': {e}")))?;

        // calamine ranges start at the first used cell
        let (first_row, first_col) = range.start().unwrap_or((0, 0));
        let mut rows = range.rows().enumerate().map(|(i, cells)| {
            let mut padded = vec![Data::Empty; first_col as usize];
            padded.extend_from_slice(cells);
            (first_row + i as u32 + 1, padded)
        });

        let headers: Vec<String> = match rows.next() {
            Some((_, cells)) => cells.iter().map(|c| cell_text(c).unwrap_or_default()).collect(),
            None => Vec::new(),
        };
        let lower = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let rows = rows
            .filter(|(_, cells)| cells.iter().any(|c| !matches!(c, Data::Empty)))
            .collect();

        sheets.push(Sheet {
            name,
            headers,
            lower,
            rows,
        });
    }
    Ok(sheets)
}

/// Classify each sheet and show its header and first rows.
pub fn preview_workbook(bytes: &[u8]) -> Result<ExcelPreview, ServerError> {
    let mut sheets = Vec::new();
    let mut errors = Vec::new();

    for sheet in read_sheets(bytes)? {
        if sheet.headers.is_empty() {
            errors.push(format!("Sheet \"{}\" is empty", sheet.name));
            continue;
        }
        sheets.push(SheetPreview {
            kind: sheet.kind(),
            headers: sheet.headers.clone(),
            rows: sheet
                .rows
                .iter()
                .take(PREVIEW_ROWS)
                .map(|(_, cells)| cells.iter().map(cell_json).collect())
                .collect(),
            row_count: sheet.rows.len(),
            name: sheet.name,
        });
    }

    Ok(ExcelPreview {
        is_valid: errors.is_empty() && !sheets.is_empty(),
        sheets,
        errors,
    })
}

/// Parse every recognised sheet. Row problems go to `errors`; only an
/// unreadable file is an `Err`.
pub fn parse_workbook(bytes: &[u8]) -> Result<ParsedExcel, ServerError> {
    let mut parsed = ParsedExcel::default();

    for sheet in read_sheets(bytes)? {
        if sheet.rows.is_empty() {
            parsed.errors.push(format!("Sheet \"{}\" is empty", sheet.name));
            continue;
        }

        match sheet.kind() {
            SheetKind::Prices => parse_price_sheet(&sheet, &mut parsed),
            SheetKind::Coefficients => {
                let axis = sheet.axis();
                let rows = parse_coefficient_sheet(&sheet, axis);
                let c = &mut parsed.coefficients;
                let target = match axis {
                    Axis::LandType => &mut c.land_types,
                    Axis::Location => &mut c.locations,
                    Axis::Area => &mut c.areas,
                    Axis::Depth => &mut c.depths,
                    Axis::FengShui => &mut c.feng_shuis,
                };
                target.extend(rows);
            }
            SheetKind::Unknown => {
                tracing::debug!(sheet = %sheet.name, "sheet not recognised, skipped");
            }
        }
    }

    tracing::info!(
        districts = parsed.districts.len(),
        coefficients = parsed.coefficients.len(),
        errors = parsed.errors.len(),
        "workbook parsed"
    );
    Ok(parsed)
}

fn parse_price_sheet(sheet: &Sheet, parsed: &mut ParsedExcel) {
    // locality -> segments, in first-seen order
    let mut groups: Vec<(String, Vec<ParsedSegment>)> = Vec::new();

    for (row_num, cells) in &sheet.rows {
        let row = RowView { sheet, cells };

        let Some(locality) = row.text(LOCALITY) else {
            parsed
                .errors
                .push(format!("[{}] Row {row_num}: missing locality", sheet.name));
            continue;
        };
        let Some(street_name) = row.text(STREET) else {
            parsed
                .errors
                .push(format!("[{}] Row {row_num}: missing street name", sheet.name));
            continue;
        };

        let base_price_min = row.number_or(PRICE_MIN, 0.0);
        let segment = ParsedSegment {
            street_name,
            segment_from: row
                .text(SEGMENT_FROM)
                .unwrap_or_else(|| DEFAULT_SEGMENT_FROM.to_string()),
            segment_to: row
                .text(SEGMENT_TO)
                .unwrap_or_else(|| DEFAULT_SEGMENT_TO.to_string()),
            base_price_min,
            base_price_max: row.number_or(PRICE_MAX, base_price_min),
            government_price: row.number_or(GOVERNMENT_PRICE, 0.0),
            adjustment_coef_min: row.number_or(ADJ_COEF_MIN, 1.0),
            adjustment_coef_max: row.number_or(ADJ_COEF_MAX, 1.0),
        };

        match groups.iter_mut().find(|(name, _)| *name == locality) {
            Some((_, segments)) => segments.push(segment),
            None => groups.push((locality, vec![segment])),
        }
    }

    for (locality, segments) in groups {
        parsed.push_segments(&locality, segments);
    }
}

/// Rows without a code or name are skipped silently.
fn parse_coefficient_sheet(sheet: &Sheet, axis: Axis) -> Vec<ParsedCoefficient> {
    let name_aliases = match axis {
        Axis::LandType => LAND_TYPE_NAME,
        Axis::Location => LOCATION_NAME,
        _ => NAME,
    };

    sheet
        .rows
        .iter()
        .filter_map(|(_, cells)| {
            let row = RowView { sheet, cells };
            let code = row.text(CODE)?;
            let name = row.text(name_aliases)?;

            let mut coef = ParsedCoefficient {
                code,
                name,
                coefficient: row.number_or(COEFFICIENT, 1.0),
                description: row.text(DESCRIPTION),
                ..Default::default()
            };
            match axis {
                Axis::Location => {
                    coef.width_min = Some(row.number_or(WIDTH_MIN, 0.0));
                    coef.width_max = Some(row.number_or(WIDTH_MAX, WIDTH_MAX_DEFAULT));
                }
                Axis::Area => {
                    coef.area_min = Some(row.number_or(AREA_MIN, 0.0));
                    coef.area_max = Some(row.number_or(AREA_MAX, AREA_MAX_DEFAULT));
                }
                Axis::Depth => {
                    coef.depth_min = Some(row.number_or(DEPTH_MIN, 0.0));
                    coef.depth_max = Some(row.number_or(DEPTH_MAX, DEPTH_MAX_DEFAULT));
                }
                Axis::LandType | Axis::FengShui => {}
            }
            Some(coef)
        })
        .collect()
}
