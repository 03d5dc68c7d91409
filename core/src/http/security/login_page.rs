//! Generated login page.
//!
//! # Spring Security Equivalent
//! `DefaultLoginPageGeneratingFilter`

use std::fmt::Write;

/// A link to start an OAuth2 login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderLink {
    pub registration_id: String,
    pub client_name: String,
}

/// Renders the HTML login page: the username/password form, an error
/// banner and one link per OAuth2 registration.
#[derive(Debug, Clone)]
pub struct LoginPage {
    processing_url: String,
    authorization_base_url: String,
    providers: Vec<ProviderLink>,
}

impl Default for LoginPage {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginPage {
    pub fn new() -> Self {
        LoginPage {
            processing_url: "/login".to_string(),
            authorization_base_url: "/oauth2/authorization".to_string(),
            providers: Vec::new(),
        }
    }

    /// Where the form posts to.
    pub fn processing_url(mut self, url: &str) -> Self {
        self.processing_url = url.to_string();
        self
    }

    pub fn authorization_base_url(mut self, url: &str) -> Self {
        self.authorization_base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn provider(mut self, registration_id: &str, client_name: &str) -> Self {
        self.providers.push(ProviderLink {
            registration_id: registration_id.to_string(),
            client_name: client_name.to_string(),
        });
        self
    }

    pub fn providers(&self) -> &[ProviderLink] {
        &self.providers
    }

    /// Renders the page. `error` shows the generic failure banner.
    pub fn render(&self, error: bool) -> String {
        let mut html = String::from(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>Please sign in</title>\n</head>\n<body>\n",
        );

        let _ = write!(
            html,
            "<form method=\"post\" action=\"{}\">\n<h2>Please sign in</h2>\n",
            escape_html(&self.processing_url)
        );
        if error {
            html.push_str("<div class=\"alert alert-danger\" role=\"alert\">Bad credentials</div>\n");
        }
        html.push_str(
            "<p><label for=\"username\">Username</label>\n\
             <input type=\"text\" id=\"username\" name=\"username\" required autofocus></p>\n\
             <p><label for=\"password\">Password</label>\n\
             <input type=\"password\" id=\"password\" name=\"password\" required></p>\n\
             <button type=\"submit\">Sign in</button>\n</form>\n",
        );

        if !self.providers.is_empty() {
            html.push_str("<h2>Login with OAuth 2.0</h2>\n<table>\n");
            for provider in &self.providers {
                let _ = writeln!(
                    html,
                    "<tr><td><a href=\"{}/{}\">{}</a></td></tr>",
                    escape_html(&self.authorization_base_url),
                    escape_html(&provider.registration_id),
                    escape_html(&provider.client_name)
                );
            }
            html.push_str("</table>\n");
        }

        html.push_str("</body>\n</html>\n");
        html
    }
}

/// Escapes text for use in HTML content and quoted attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
