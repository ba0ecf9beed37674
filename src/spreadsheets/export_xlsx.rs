use crate::domain::catalog::{TypeWithValues, AREA, DEPTH, FENG_SHUI, LAND_TYPE, LOCATION};
use crate::domain::prices::SegmentWithPath;
use crate::errors::ServerError;
use crate::responses::xlsx_response;
use crate::responses::ResultResp;
use rust_xlsxwriter::{Format, Workbook, Worksheet};

const PRICE_SHEET: &str = "Giá đất";

/// Laid out with the same headers the importer recognises, so an exported
/// file can be edited and imported back.
pub fn export_prices_xlsx(segments: &[SegmentWithPath], catalog: &[TypeWithValues]) -> ResultResp {
    let buffer = build_price_workbook(segments, catalog)?;
    xlsx_response(buffer, "bang_gia_dat.xlsx")
}

pub fn build_price_workbook(
    segments: &[SegmentWithPath],
    catalog: &[TypeWithValues],
) -> Result<Vec<u8>, ServerError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(PRICE_SHEET)
        .map_err(|e| ServerError::XlsxError(format!("Failed to name sheet: {}", e)))?;

    let headers = [
        "Địa phương",
        "Tên đường",
        "Từ",
        "Đến",
        "Giá min",
        "Giá max",
        "Giá nhà nước",
        "Hệ số min",
        "Hệ số max",
    ];
    write_header(worksheet, &headers, &bold)?;

    for (i, s) in segments.iter().enumerate() {
        let r = (i + 1) as u32;
        let seg = &s.segment;

        write_text(worksheet, r, 0, &s.district_name)?;
        write_text(worksheet, r, 1, &s.street_name)?;
        write_text(worksheet, r, 2, &seg.segment_from)?;
        write_text(worksheet, r, 3, &seg.segment_to)?;
        write_num(worksheet, r, 4, seg.base_price_min)?;
        write_num(worksheet, r, 5, seg.base_price_max)?;
        write_num(worksheet, r, 6, seg.government_price)?;
        write_num(worksheet, r, 7, seg.adjustment_coef_min)?;
        write_num(worksheet, r, 8, seg.adjustment_coef_max)?;
    }

    for entry in catalog.iter().filter(|e| !e.values.is_empty()) {
        // only the canonical axes can be read back
        let Some((sheet_name, range_headers)) = axis_sheet(&entry.coefficient_type.code) else {
            continue;
        };

        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(sheet_name)
            .map_err(|e| ServerError::XlsxError(format!("Failed to name sheet '{}': {}", sheet_name, e)))?;

        let mut headers = vec!["Mã", "Tên", "Hệ số"];
        if let Some([min, max]) = range_headers {
            headers.extend([min, max]);
        }
        headers.push("Mô tả");
        let desc_col = (headers.len() - 1) as u16;
        write_header(worksheet, &headers, &bold)?;

        for (i, v) in entry.values.iter().enumerate() {
            let r = (i + 1) as u32;
            write_text(worksheet, r, 0, &v.code)?;
            write_text(worksheet, r, 1, &v.name)?;
            write_num(worksheet, r, 2, v.coefficient)?;
            if range_headers.is_some() {
                if let Some(min) = v.range_min {
                    write_num(worksheet, r, 3, min)?;
                }
                if let Some(max) = v.range_max {
                    write_num(worksheet, r, 4, max)?;
                }
            }
            if let Some(desc) = &v.description {
                write_text(worksheet, r, desc_col, desc)?;
            }
        }
    }

    workbook
        .save_to_buffer()
        .map_err(|e| ServerError::XlsxError(format!("Failed to save workbook: {}", e)))
}

/// Fixed sheet name and range columns per canonical axis. Admins may rename
/// a type, so the sheet name never comes from the catalog; the parser routes
/// land type and feng shui sheets by these names.
fn axis_sheet(code: &str) -> Option<(&'static str, Option<[&'static str; 2]>)> {
    match code {
        LAND_TYPE => Some(("Loại đất", None)),
        LOCATION => Some(("Vị trí", Some(["Độ rộng min", "Độ rộng max"]))),
        AREA => Some(("Diện tích", Some(["Diện tích min", "Diện tích max"]))),
        DEPTH => Some(("Chiều sâu", Some(["Chiều sâu min", "Chiều sâu max"]))),
        FENG_SHUI => Some(("Phong thủy", None)),
        _ => None,
    }
}

fn write_header(worksheet: &mut Worksheet, headers: &[&str], bold: &Format) -> Result<(), ServerError> {
    for (col, header) in headers.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, *header, bold)
            .map_err(|e| {
                ServerError::XlsxError(format!("Failed to write header '{}': {}", header, e))
            })?;
    }
    Ok(())
}

fn write_text(worksheet: &mut Worksheet, row: u32, col: u16, text: &str) -> Result<(), ServerError> {
    worksheet
        .write_string(row, col, text)
        .map_err(|e| ServerError::XlsxError(format!("Failed to write row {}: {}", row, e)))?;
    Ok(())
}

fn write_num(worksheet: &mut Worksheet, row: u32, col: u16, value: f64) -> Result<(), ServerError> {
    worksheet
        .write_number(row, col, value)
        .map_err(|e| ServerError::XlsxError(format!("Failed to write row {}: {}", row, e)))?;
    Ok(())
}
