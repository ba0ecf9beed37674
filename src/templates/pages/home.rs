// templates/pages/home.rs

use crate::db::settings::BrandSettings;
use crate::domain::catalog::{TypeWithValues, AREA, DEPTH, FENG_SHUI, LAND_TYPE, LOCATION};
use crate::domain::prices::Locality;
use crate::templates::{card, desktop_layout};
use maud::{html, Markup, PreEscaped};

// Cascading selects and the valuation call. Server-rendered options cover the
// first level; the rest comes from the JSON API.
const LOOKUP_JS: &str = r#"
const $ = (id) => document.getElementById(id);
async function load(url, select, label) {
  select.innerHTML = '<option value="">-- chọn --</option>';
  if (!url) return;
  const rows = await (await fetch(url)).json();
  for (const r of rows) {
    const o = document.createElement('option');
    o.value = r.id; o.textContent = label(r); select.appendChild(o);
  }
}
$('locality').addEventListener('change', (e) =>
  load(e.target.value && '/api/streets?locality_id=' + e.target.value, $('street'), (r) => r.name));
$('street').addEventListener('change', (e) =>
  load(e.target.value && '/api/segments?street_id=' + e.target.value, $('segment'),
       (r) => r.segment_from + ' - ' + r.segment_to));
$('lookup').addEventListener('submit', async (e) => {
  e.preventDefault();
  const codes = {};
  for (const s of document.querySelectorAll('select[data-axis]')) {
    if (s.value) codes[s.dataset.axis] = s.value;
  }
  const res = await fetch('/api/valuate', {
    method: 'POST', headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify({ segmentId: Number($('segment').value), area: Number($('area').value), codes }),
  });
  const body = await res.json();
  $('result').textContent = res.ok
    ? 'Đơn giá: ' + body.display.pricePerM2 + ' | Tổng: ' + body.display.totalPrice
    : body.error;
});
"#;

/// Request field for a type. Only the canonical axes take part in valuation.
fn axis_field(code: &str) -> Option<&'static str> {
    match code {
        LAND_TYPE => Some("landType"),
        LOCATION => Some("location"),
        AREA => Some("area"),
        DEPTH => Some("depth"),
        FENG_SHUI => Some("fengShui"),
        _ => None,
    }
}

pub fn home_page(brand: &BrandSettings, localities: &[Locality], catalog: &[TypeWithValues]) -> Markup {
    desktop_layout(
        brand,
        "Tra cứu giá đất",
        html! {
            main class="container" {
                h1 { "Tra cứu giá đất" }

                (card("Vị trí thửa đất", html! {
                    form id="lookup" {
                        p {
                            label for="locality" { "Địa phương " }
                            select id="locality" required {
                                option value="" { "-- chọn --" }
                                @for l in localities {
                                    option value=(l.id) { (l.name) }
                                }
                            }
                        }
                        p {
                            label for="street" { "Tên đường " }
                            select id="street" required {}
                        }
                        p {
                            label for="segment" { "Đoạn đường " }
                            select id="segment" required {}
                        }
                        p {
                            label for="area" { "Diện tích (m²) " }
                            input id="area" type="number" min="0.01" step="0.01" required;
                        }

                        @for entry in catalog {
                            @let ty = &entry.coefficient_type;
                            @if let Some(field) = axis_field(&ty.code) {
                                p {
                                    label { (ty.name) " " }
                                    select data-axis=(field) {
                                        option value="" { "Không áp dụng" }
                                        @for v in &entry.values {
                                            option value=(v.code) { (v.name) " (× " (v.coefficient) ")" }
                                        }
                                    }
                                }
                            }
                        }

                        button type="submit" { "Tính giá" }
                    }
                    p id="result" style="font-weight: 600;" {}
                }))
            }
            script { (PreEscaped(LOOKUP_JS)) }
        },
    )
}
