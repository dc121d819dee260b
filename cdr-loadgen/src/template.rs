use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

/// Name to value mapping handed to [`Template::render`].
pub type Fields = BTreeMap<&'static str, String>;

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("cannot read template {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown placeholder `{name}` in template")]
    UnknownPlaceholder { name: String },

    #[error("malformed placeholder at byte {offset}: {reason}")]
    Malformed { offset: usize, reason: &'static str },

    #[error("placeholder `{name}` uses %d but its value `{value}` is not an integer")]
    NotAnInteger { name: String, value: String },
}

/// Payload template with `%(name)s` / `%(name)d` placeholders and `%%` escapes.
///
/// The text is kept as loaded; placeholders are only resolved when rendering,
/// so a broken template surfaces on the first render rather than at load.
#[derive(Debug, Clone)]
pub struct Template {
    text: String,
}

impl Template {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| TemplateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), bytes = text.len(), "template loaded");
        Ok(Self { text })
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn render(&self, fields: &Fields) -> Result<String, TemplateError> {
        let text = self.text.as_str();
        let mut out = String::with_capacity(text.len() + 64);
        let mut rest = text;

        while let Some(pos) = rest.find('%') {
            out.push_str(&rest[..pos]);
            let offset = text.len() - rest.len() + pos;
            let tail = &rest[pos + 1..];

            if let Some(after) = tail.strip_prefix('%') {
                out.push('%');
                rest = after;
                continue;
            }

            let Some(tail) = tail.strip_prefix('(') else {
                return Err(TemplateError::Malformed {
                    offset,
                    reason: "expected `(` or `%` after `%`",
                });
            };
            let Some(close) = tail.find(')') else {
                return Err(TemplateError::Malformed {
                    offset,
                    reason: "unterminated placeholder name",
                });
            };
            let name = &tail[..close];
            if name.is_empty() {
                return Err(TemplateError::Malformed {
                    offset,
                    reason: "empty placeholder name",
                });
            }

            let after_name = &tail[close + 1..];
            let mut conv = after_name.chars();
            let value = fields
                .get(name)
                .ok_or_else(|| TemplateError::UnknownPlaceholder {
                    name: name.to_owned(),
                })?;
            match conv.next() {
                Some('s') => out.push_str(value),
                Some('d') => {
                    if !is_integer(value) {
                        return Err(TemplateError::NotAnInteger {
                            name: name.to_owned(),
                            value: value.clone(),
                        });
                    }
                    out.push_str(value);
                }
                _ => {
                    return Err(TemplateError::Malformed {
                        offset,
                        reason: "conversion must be `s` or `d`",
                    })
                }
            }
            rest = conv.as_str();
        }
        out.push_str(rest);
        Ok(out)
    }
}

fn is_integer(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}
