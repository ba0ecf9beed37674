use maud::{html, Markup};

pub fn card(title: &str, body: Markup) -> Markup {
    html! {
        div class="card" {
            h2 { (title) }
            div class="card-body" {
                (body)
            }
        }
    }
}

/// Label on the left, value on the right.
pub fn stat_row(label: &str, value: impl maud::Render) -> Markup {
    html! {
        tr {
            td class="muted" { (label) }
            td style="text-align: right;" { (value) }
        }
    }
}
