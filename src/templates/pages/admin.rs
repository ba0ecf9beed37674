use crate::db::history::SearchRecord;
use crate::db::prices::{SegmentPage, SegmentQuery};
use crate::db::settings::BrandSettings;
use crate::domain::catalog::TypeWithValues;
use crate::domain::format::{format_price, format_price_per_m2};
use crate::templates::components::stat_row;
use crate::templates::{card, desktop_layout};
use maud::{html, Markup, PreEscaped};

const IMPORT_JS: &str = r#"
document.getElementById('import').addEventListener('submit', async (e) => {
  e.preventDefault();
  const file = document.getElementById('file').files[0];
  if (!file) return;
  const mode = e.submitter && e.submitter.value === 'preview' ? '/admin/import/preview' : '/admin/import';
  const res = await fetch(mode, { method: 'POST', body: await file.arrayBuffer() });
  document.getElementById('import-result').textContent = JSON.stringify(await res.json(), null, 2);
});
"#;

/// Same filters, another page.
fn page_href(query: &SegmentQuery, page: u32) -> String {
    let mut qs = url::form_urlencoded::Serializer::new(String::new());
    if let Some(search) = &query.search {
        qs.append_pair("search", search);
    }
    if let Some(id) = query.district_id {
        qs.append_pair("locality_id", &id.to_string());
    }
    if let Some(id) = query.street_id {
        qs.append_pair("street_id", &id.to_string());
    }
    qs.append_pair("page", &page.to_string());
    format!("/admin?{}", qs.finish())
}

pub struct AdminVm {
    pub segments: SegmentPage,
    pub query: SegmentQuery,
    pub catalog: Vec<TypeWithValues>,
    pub history: Vec<SearchRecord>,
}

pub fn admin_page(brand: &BrandSettings, vm: &AdminVm) -> Markup {
    let pages = (vm.segments.total.max(0) as u32).div_ceil(vm.segments.page_size.max(1)).max(1);

    desktop_layout(
        brand,
        "Quản trị",
        html! {
            main class="container" {
                h1 { "Quản trị bảng giá" }

                (card("Nhập / xuất Excel", html! {
                    form id="import" {
                        input id="file" type="file" accept=".xlsx";
                        button type="submit" name="mode" value="preview" { "Xem trước" }
                        button type="submit" name="mode" value="import" { "Nhập dữ liệu" }
                        a href="/admin/export.xlsx" style="margin-left: 1rem;" { "Tải bảng giá (.xlsx)" }
                    }
                    pre id="import-result" class="muted" {}
                }))

                (card("Bảng giá", html! {
                    form method="get" action="/admin" style="margin-bottom: 1rem;" {
                        input type="search" name="search" placeholder="Tìm đoạn đường"
                            value=(vm.query.search.as_deref().unwrap_or(""));
                        button type="submit" { "Tìm" }
                    }
                    table {
                        thead {
                            tr {
                                th { "Địa phương" }
                                th { "Tên đường" }
                                th { "Đoạn" }
                                th { "Giá min" }
                                th { "Giá max" }
                                th { "Giá nhà nước" }
                            }
                        }
                        tbody {
                            @for s in &vm.segments.data {
                                tr {
                                    td { (s.district_name) }
                                    td { (s.street_name) }
                                    td { (s.segment.label()) }
                                    td { (format_price_per_m2(s.segment.base_price_min)) }
                                    td { (format_price_per_m2(s.segment.base_price_max)) }
                                    td { (format_price(s.segment.government_price)) }
                                }
                            }
                        }
                    }
                    p class="muted" {
                        "Trang " (vm.segments.page) " / " (pages) " (" (vm.segments.total) " đoạn)"
                        @if vm.segments.page > 1 {
                            " " a href=(page_href(&vm.query, vm.segments.page - 1)) { "← Trước" }
                        }
                        @if vm.segments.page < pages {
                            " " a href=(page_href(&vm.query, vm.segments.page + 1)) { "Sau →" }
                        }
                    }
                }))

                @for entry in &vm.catalog {
                    @let ty = &entry.coefficient_type;
                    (card(&format!("Hệ số {}", ty.name), html! {
                        table {
                            thead {
                                tr {
                                    th { "Mã" }
                                    th { "Tên" }
                                    th { "Hệ số" }
                                    @if ty.has_range {
                                        th { (ty.range_field_name.as_deref().unwrap_or("Khoảng"))
                                             @if let Some(unit) = &ty.range_unit { " (" (unit) ")" } }
                                    }
                                }
                            }
                            tbody {
                                @for v in &entry.values {
                                    tr {
                                        td { (v.code) }
                                        td { (v.name) }
                                        td { (v.coefficient) }
                                        @if ty.has_range {
                                            td {
                                                (v.range_min.map(|n| n.to_string()).unwrap_or_default())
                                                " - "
                                                (v.range_max.map(|n| n.to_string()).unwrap_or_default())
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }))
                }

                (card("Lượt tra cứu gần đây", html! {
                    table {
                        tbody {
                            @for h in &vm.history {
                                (stat_row(
                                    &format!(
                                        "{} / {} / {}",
                                        h.district_name.as_deref().unwrap_or("-"),
                                        h.street_name.as_deref().unwrap_or("-"),
                                        h.segment_desc.as_deref().unwrap_or("-"),
                                    ),
                                    format_price(h.total_price.unwrap_or(0) as f64),
                                ))
                            }
                        }
                    }
                }))
            }
            script { (PreEscaped(IMPORT_JS)) }
        },
    )
}
