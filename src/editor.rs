use std::sync::Arc;

use webconf_codec::{escape_html, percent_decode};
use webconf_core::WebConfError;
use webconf_transport::{ClientSession, Responder};

use crate::store::ConfigStore;

/// Serves the editing page at `/` and `/<form_name>`, and applies
/// `/<form_name>?<path>=<value>` updates before re-rendering it.
pub struct ConfigEditor {
    form_name: String,
    store: Arc<ConfigStore>,
    page_start: String,
    page_end: String,
}

enum Route<'a> {
    Page,
    Update(&'a str),
}

impl ConfigEditor {
    pub fn new(form_name: impl Into<String>, store: Arc<ConfigStore>) -> Self {
        let form_name = form_name.into();
        let page_start = format!(
            "<HTML><TITLE>Edit Configuration</TITLE>\n  <BODY>\n    <H1>Configuration Editor</H1>\n\
             <FORM ACTION=\"/{form_name}\"><INPUT type=\"submit\" value=\"Refresh\" /></FORM>\n\n\
             Enter new values and hit enter or Submit:<br>\n"
        );
        Self {
            form_name,
            store,
            page_start,
            page_end: "  </BODY>\n</HTML>\n".to_string(),
        }
    }

    fn route<'p>(&self, path: &'p str) -> Option<Route<'p>> {
        if path == "/" {
            return Some(Route::Page);
        }
        let rest = path.strip_prefix('/')?.strip_prefix(self.form_name.as_str())?;
        if rest.is_empty() {
            Some(Route::Page)
        } else {
            rest.strip_prefix('?').map(Route::Update)
        }
    }

    /// Builds the full page, applying `query` first when present.
    ///
    /// The query is split on its first `=` only: everything after it is one
    /// value, so a request carries exactly one field update. Both halves are
    /// URL-decoded, since browsers encode the field names of the rendered forms.
    pub fn page(&self, query: Option<&str>) -> String {
        let mut store = self.store.lock();
        let mut banner = String::new();

        if let Some(query) = query.filter(|q| q.len() >= 2) {
            match query.split_once('=') {
                None => banner.push_str("<P>ERROR! Missing equals sign in CGI parameters!\n"),
                Some((raw_field, raw_value)) => {
                    let field = percent_decode(raw_field);
                    let value = percent_decode(raw_value);
                    tracing::info!(field = %field, value = %value, "setting field");
                    if let Err(e) = store.apply(&field, &value) {
                        banner.push_str(&apply_banner(e));
                    }
                    if let Err(e) = store.save() {
                        tracing::warn!(error = %e, "save after edit failed");
                        banner.push_str(&format!(
                            "<P>ERROR! Could not save configuration: {}\n",
                            escape_html(&e.to_string())
                        ));
                    }
                }
            }
        }

        let form = store.render(&self.form_name);
        let len = self.page_start.len() + banner.len() + form.len() + self.page_end.len();
        let mut html = String::with_capacity(len);
        html.push_str(&self.page_start);
        html.push_str(&banner);
        html.push_str(&form);
        html.push_str(&self.page_end);
        html
    }
}

fn apply_banner(err: WebConfError) -> String {
    match err {
        WebConfError::FieldNotFound(field) => {
            format!("<P>ERROR! Missing field '{}'!\n", escape_html(&field))
        }
        WebConfError::InvalidValue { field, value } => format!(
            "<P>ERROR! Invalid value '{}' for field '{}'!\n",
            escape_html(&value),
            escape_html(&field)
        ),
        other => format!("<P>ERROR! {}!\n", escape_html(&other.to_string())),
    }
}

impl Responder for ConfigEditor {
    fn respond(&self, client: &mut ClientSession) -> bool {
        let html = match self.route(client.path()) {
            Some(Route::Page) => self.page(None),
            Some(Route::Update(query)) => self.page(Some(query)),
            None => return false,
        };
        if let Err(e) = client.send("text/html", html.as_bytes()) {
            tracing::warn!(peer = %client.peer(), error = %e, "failed to send editor page");
        }
        true
    }
}
