//! Codificación del campo `imagenes`
//!
//! El campo guarda una o varias URLs en un único texto. Conviven tres formatos
//! históricos que deben aceptarse en lectura:
//!
//! - literal de array PostgreSQL: `{"url1","url2"}` (también sin comillas)
//! - lista separada por comas: `url1,url2`
//! - una URL suelta: `url1`
//!
//! Toda escritura nueva usa el literal de array con comillas.

/// Imagen a mostrar cuando un vehículo no tiene ninguna
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.png";

/// URL aceptable como imagen: http(s) o ruta local
pub fn is_valid_image_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://") || url.starts_with('/')
}

/// Decodifica el campo en sus URLs, probando formatos en orden:
/// array entre llaves, lista por comas y URL suelta.
pub fn decode_image_field(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let candidates = if trimmed.starts_with('{') && trimmed.ends_with('}') {
        parse_array_literal(&trimmed[1..trimmed.len() - 1])
    } else if trimmed.contains(',') {
        trimmed
            .split(',')
            .map(|part| strip_quotes(part.trim()).to_string())
            .collect()
    } else {
        vec![strip_quotes(trimmed).to_string()]
    };

    candidates
        .into_iter()
        .filter(|url| is_valid_image_url(url))
        .collect()
}

/// Decodifica un campo opcional; `None` equivale a ninguna imagen
pub fn decode_optional(raw: Option<&str>) -> Vec<String> {
    raw.map(decode_image_field).unwrap_or_default()
}

/// Codifica en el formato canónico `{"url1","url2"}`
pub fn encode_image_field<S: AsRef<str>>(urls: &[S]) -> String {
    let items: Vec<String> = urls
        .iter()
        .map(|url| format!("\"{}\"", escape_element(url.as_ref())))
        .collect();
    format!("{{{}}}", items.join(","))
}

fn escape_element(url: &str) -> String {
    url.replace('\\', "\\\\").replace('"', "\\\"")
}

fn strip_quotes(s: &str) -> &str {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Recorre el contenido de un literal de array respetando comillas y escapes
fn parse_array_literal(content: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut was_quoted = false;
    let mut chars = content.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' if in_quotes => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '"' => {
                in_quotes = !in_quotes;
                was_quoted = true;
            }
            ',' if !in_quotes => {
                push_element(&mut items, &current, was_quoted);
                current.clear();
                was_quoted = false;
            }
            _ => current.push(c),
        }
    }
    push_element(&mut items, &current, was_quoted);

    items
}

fn push_element(items: &mut Vec<String>, raw: &str, was_quoted: bool) {
    let value = if was_quoted { raw.to_string() } else { raw.trim().to_string() };
    if value.is_empty() || (!was_quoted && value.eq_ignore_ascii_case("NULL")) {
        return;
    }
    items.push(value);
}
