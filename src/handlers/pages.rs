use axum::{
    extract::{Query, Request},
    response::Html,
};
use serde::Deserialize;

use crate::auth::AuthUser;

/// Shell for the band pages; the views themselves live in the browser bundle.
pub async fn page_shell(req: Request) -> Html<String> {
    let path = req.uri().path();
    let title = page_title(path);
    let greeting = req
        .extensions()
        .get::<AuthUser>()
        .and_then(|u| u.email.as_deref())
        .map(|email| format!("<p class=\"user\">{}</p>", escape_html(email)))
        .unwrap_or_default();

    Html(format!(
        "<!doctype html>\n<html lang=\"es\">\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
         <body data-page=\"{path}\">\n<h1>{title}</h1>\n{greeting}\n\
         <form method=\"post\" action=\"/auth/logout\"><button type=\"submit\">Salir</button></form>\n\
         </body>\n</html>\n",
        title = escape_html(title),
        path = escape_html(path),
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginPageQuery {
    pub error: Option<String>,
}

pub async fn login_page(Query(query): Query<LoginPageQuery>) -> Html<String> {
    let error = match query.error.as_deref() {
        Some("invalid_credentials") => "<p class=\"error\">Credenciales incorrectas.</p>",
        Some(_) => "<p class=\"error\">Servicio no disponible, intenta de nuevo.</p>",
        None => "",
    };
    Html(format!(
        "<!doctype html>\n<html lang=\"es\">\n<head><meta charset=\"utf-8\"><title>Iniciar Sesión</title></head>\n\
         <body data-page=\"/login\">\n<h1>Iniciar Sesión</h1>\n{error}\n\
         <form method=\"post\" action=\"/auth/login\">\n\
         <input type=\"email\" name=\"email\" required>\n\
         <input type=\"password\" name=\"password\" required>\n\
         <button type=\"submit\">Entrar</button>\n</form>\n</body>\n</html>\n"
    ))
}

fn page_title(path: &str) -> &'static str {
    let section = path.trim_start_matches('/').split('/').next().unwrap_or_default();
    match section {
        "" => "Panel",
        "canciones" => "Canciones",
        "calendario" => "Calendario",
        "tareas" => "Tareas",
        "ideas" => "Ideas",
        "fotos" => "Fotos",
        "chat" => "Chat",
        _ => "Banda",
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
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
