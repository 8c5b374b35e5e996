use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, Response, StatusCode};
use leaf_serve::Crop;

pub const HOME: &str = include_str!("../templates/home.html");
pub const DEMO: &str = include_str!("../templates/demo.html");
pub const TEAM: &str = include_str!("../templates/team.html");
const OPTIONS: &str = include_str!("../templates/options.html");

pub fn html(page: impl Into<Body>) -> Response<Body> {
    with_type(StatusCode::OK, page, "text/html; charset=utf-8")
}

pub fn text(status: StatusCode, body: impl Into<Body>) -> Response<Body> {
    with_type(status, body, "text/plain; charset=utf-8")
}

fn with_type(status: StatusCode, body: impl Into<Body>, content_type: &'static str) -> Response<Body> {
    let mut response = Response::new(body.into());
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// Crop selection form, with `selected` checked and `errors` listed under it.
pub fn options(csrf_token: &str, selected: Option<&str>, errors: &[&str]) -> String {
    let choices = Crop::ALL
        .iter()
        .enumerate()
        .map(|(i, crop)| {
            let checked = if selected == Some(crop.name()) {
                " checked"
            } else {
                ""
            };
            format!(
                "        <li><input id=\"crop-{i}\" name=\"crop\" type=\"radio\" value=\"{name}\"{checked}> \
                 <label for=\"crop-{i}\">{name}</label></li>",
                i = i,
                name = crop.name(),
                checked = checked
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let errors = if errors.is_empty() {
        String::new()
    } else {
        let items: String = errors
            .iter()
            .map(|e| format!("<li>{}</li>", e))
            .collect();
        format!("      <ul class=\"errors\">{}</ul>", items)
    };

    OPTIONS
        .replace("{{ csrf_token }}", csrf_token)
        .replace("{{ choices }}", &choices)
        .replace("{{ errors }}", &errors)
}
