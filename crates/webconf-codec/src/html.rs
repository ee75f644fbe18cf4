use std::fmt::Write as _;

use webconf_core::{EnumChoice, FieldPath, Visitor};

/// Escapes quotes and markup characters for use in HTML text and attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            _ => out.push(c),
        }
    }
    out
}

const DEPTH_COLORS: [&str; 4] = ["#f0f0f0", "#d0d0d0", "#b0b0b0", "#909090"];

/// Renders every field as its own HTML form.
///
/// One form per field keeps each submission down to a single
/// `path=value` pair. Composites become indented blocks.
pub struct FormRenderer {
    html: String,
    form_name: String,
    path: FieldPath,
    div_count: usize,
}

impl FormRenderer {
    pub fn new(form_name: impl Into<String>) -> Self {
        Self {
            html: String::new(),
            form_name: form_name.into(),
            path: FieldPath::new(),
            div_count: 0,
        }
    }

    pub fn into_html(self) -> String {
        self.html
    }

    /// Opens a background `<DIV>`, alternating the shade within a depth.
    fn item_div(&mut self) {
        self.div_count += 1;
        let base = DEPTH_COLORS[self.path.depth().min(DEPTH_COLORS.len() - 1)];
        let mut color = base.as_bytes().to_vec();
        if self.div_count % 2 == 1 {
            color[6] = b'9';
        } else {
            color[2] = b'9';
        }
        let color = String::from_utf8_lossy(&color);
        let _ = write!(self.html, "<DIV STYLE=\"background-color:{color}\">\n\t");
    }

    fn start_form(&mut self) {
        self.item_div();
        let _ = write!(self.html, "<FORM ACTION=\"/{}\">", self.form_name);
    }

    fn end_form(&mut self) {
        self.html
            .push_str("<INPUT type=\"submit\" value=\"Go!\"/></FORM></DIV>\n\n");
    }

    fn text_input(&mut self, name: &str, current: &str) {
        let full = escape_html(&self.path.qualify(name));
        self.start_form();
        let _ = write!(
            self.html,
            "{}: <INPUT type=\"text\" name=\"{full}\" value=\"{current}\" />",
            escape_html(name)
        );
        self.end_form();
    }
}

impl Visitor for FormRenderer {
    fn visit_float(&mut self, name: &str, value: &mut f32) {
        self.text_input(name, &format!("{:.6}", value));
    }

    fn visit_int(&mut self, name: &str, value: &mut i32) {
        self.text_input(name, &value.to_string());
    }

    fn visit_string(&mut self, name: &str, value: &mut String) {
        let newlines = value.matches('\n').count();
        if newlines == 0 {
            self.text_input(name, &escape_html(value));
            return;
        }
        let full = escape_html(&self.path.qualify(name));
        self.start_form();
        let _ = write!(
            self.html,
            "{}:<br>\n<textarea name=\"{full}\" cols=\"85\" rows=\"{}\">{}</textarea><br>",
            escape_html(name),
            newlines + 2,
            escape_html(value)
        );
        self.end_form();
    }

    fn visit_enum(&mut self, name: &str, value: &mut u32, choices: &[EnumChoice]) {
        let full = escape_html(&self.path.qualify(name));
        self.start_form();
        let _ = write!(self.html, "{}: <SELECT name=\"{full}\" >\n", escape_html(name));
        for choice in choices {
            let selected = if choice.value == *value {
                "selected=\"selected\""
            } else {
                ""
            };
            let _ = write!(
                self.html,
                "<option value=\"{}\" {selected}>{}</option>\n",
                choice.value,
                escape_html(choice.label)
            );
        }
        self.html.push_str("</SELECT>");
        self.end_form();
    }

    fn begin_composite(&mut self, name: &str) {
        self.item_div();
        let _ = write!(
            self.html,
            "{}<B>{}</B> {{",
            escape_html(self.path.prefix()),
            escape_html(name)
        );
        self.path.push(name);
        self.html
            .push_str("<DIV STYLE=\"margin-left:1em; padding-left:1em;\">\n");
    }

    fn end_composite(&mut self, _name: &str) {
        self.html.push_str("</DIV>}<br>\n\n");
        self.path.pop();
        self.html.push_str("</DIV><br>");
    }

    fn comment(&mut self, text: &str) {
        self.html.push_str(text);
    }
}
