use crate::db::settings::BrandSettings;
use maud::{html, Markup, DOCTYPE};

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; color: #1f2937; }
header { display: flex; align-items: center; justify-content: space-between; padding: 12px 24px; box-shadow: 0 1px 3px rgba(0,0,0,.1); }
header img { height: 36px; margin-right: 12px; }
header nav ul { display: flex; gap: 16px; list-style: none; margin: 0; padding: 0; }
main.container { max-width: 1100px; margin: 2rem auto; padding: 0 1rem; }
.card { border: 1px solid #e5e7eb; border-radius: 8px; padding: 1rem 1.25rem; margin-bottom: 2rem; }
table { width: 100%; border-collapse: collapse; }
th { padding: 10px 8px; border-bottom: 2px solid #e5e7eb; text-align: left; }
td { padding: 8px; border-bottom: 1px solid #f3f4f6; }
.muted { color: #6b7280; font-size: .9em; }
"#;

pub fn desktop_layout(brand: &BrandSettings, title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="vi" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) " | " (brand.app_name) }
                style { (STYLE) }
            }
            body {
                header {
                    div style="display: flex; align-items: center;" {
                        @if let Some(logo) = &brand.logo_url {
                            img src=(logo) alt=(brand.app_name);
                        }
                        div {
                            h3 style="margin: 0;" { (brand.app_name) }
                            @if !brand.branch_name.is_empty() {
                                div class="muted" { (brand.branch_name) }
                            }
                        }
                    }
                    nav {
                        ul {
                            li { a href="/" { "Tra cứu" } }
                            li { a href="/admin" { "Quản trị" } }
                        }
                    }
                }
                (content)
                @if !brand.slogan.is_empty() {
                    footer class="muted" style="text-align: center; padding: 2rem 0;" { (brand.slogan) }
                }
            }
        }
    }
}
