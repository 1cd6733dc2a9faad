//! HTML rendering for the status page.
//!
//! Template loading mirrors the reference daemon's `Tera::default()` plus
//! `add_raw_template` approach, except the raw source here is either the
//! built-in default page or whatever `status.html` an operator drops in
//! `web_static_dir` (resolved the same way the original Python service let
//! an operator override its Jinja2 templates by dropping files next to the
//! static assets).

use miette::{Context as _, IntoDiagnostic, Result};
use tera::{Context as TeraCtx, Tera};

use crate::core::SiteView;

const STATUS_TEMPLATE_NAME: &str = "status.html";

const DEFAULT_STATUS_TEMPLATE: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{{ site.title }} status</title>
  <link rel="stylesheet" href="/static/style.css">
</head>
<body>
  <h1 class="status-{{ site.status }}">{{ site.title }}</h1>
  {% if site.state_is_forced %}
  <div class="operator-message">
    <h2>{{ site.message_title }}</h2>
    <p>{{ site.message_body }}</p>
  </div>
  {% endif %}
  <ul class="services">
  {% for service in site.services %}
    <li class="status-{{ service.status }}">
      <strong>{{ service.label }}</strong>
      <ul class="components">
      {% for component in service.components %}
        <li class="status-{{ component.status }}">{{ component.label }}</li>
      {% endfor %}
      </ul>
    </li>
  {% endfor %}
  </ul>
</body>
</html>
"#;

pub struct Renderer {
	tera: Tera,
}

impl Renderer {
	/// Loads `status.html` from `web_static_dir` if present, falling back to
	/// the built-in template otherwise.
	pub fn load(web_static_dir: &std::path::Path) -> Result<Self> {
		let mut tera = Tera::default();
		let custom = web_static_dir.join(STATUS_TEMPLATE_NAME);
		let source = std::fs::read_to_string(&custom).unwrap_or_else(|_| DEFAULT_STATUS_TEMPLATE.to_string());
		tera.add_raw_template(STATUS_TEMPLATE_NAME, &source)
			.into_diagnostic()
			.wrap_err("compiling status page template")?;
		Ok(Self { tera })
	}

	pub fn render(&self, view: &SiteView) -> std::result::Result<String, tera::Error> {
		let mut context = TeraCtx::new();
		context.insert("site", &SerializableView::from(view));
		self.tera.render(STATUS_TEMPLATE_NAME, &context)
	}
}

/// A serde-friendly mirror of [`SiteView`], since tera contexts need
/// `Serialize` and severities render as lowercase CSS-tag-ish strings.
#[derive(serde::Serialize)]
struct SerializableView {
	title: String,
	status: String,
	services: Vec<SerializableService>,
	message_title: String,
	message_body: String,
	state_is_forced: bool,
}

#[derive(serde::Serialize)]
struct SerializableService {
	label: String,
	status: String,
	components: Vec<SerializableComponent>,
}

#[derive(serde::Serialize)]
struct SerializableComponent {
	label: String,
	status: String,
}

impl From<&SiteView> for SerializableView {
	fn from(view: &SiteView) -> Self {
		Self {
			title: view.title.clone(),
			status: view.status.css_tag().to_string(),
			services: view
				.services
				.iter()
				.map(|s| SerializableService {
					label: s.label.clone(),
					status: s.status.css_tag().to_string(),
					components: s
						.components
						.iter()
						.map(|c| SerializableComponent {
							label: c.label.clone(),
							status: c.status.css_tag().to_string(),
						})
						.collect(),
				})
				.collect(),
			message_title: view.message_title.clone(),
			message_body: view.message_body.clone(),
			state_is_forced: view.state_is_forced,
		}
	}
}
