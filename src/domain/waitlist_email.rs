//! src/domain/waitlist_email.rs
use validator::ValidateEmail;

/// How hard to look at a submitted address before letting it onto the list.
#[derive(serde::Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmailPolicy {
    /// Shape check only: something, `@`, something, `.`, something, with no
    /// whitespace. Accepts plenty of addresses that could never receive
    /// mail; it exists to reject the grossly malformed, nothing more.
    #[default]
    Permissive,
    /// Full address validation.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitlistEmail(String);

impl WaitlistEmail {
    /// Returns `Ok(WaitlistEmail)` holding the normalized address if the
    /// input satisfies `policy`, `Err(String)` otherwise.
    ///
    /// Normalization is trim-then-validate: surrounding whitespace is
    /// stripped first and the check runs on the trimmed value, which is
    /// also the form that gets stored.
    pub fn parse(input: String, policy: EmailPolicy) -> Result<Self, String> {
        let email = input.trim();
        let accepted = match policy {
            EmailPolicy::Permissive => matches_permissive_shape(email),
            EmailPolicy::Strict => email.validate_email(),
        };
        if accepted {
            Ok(Self(email.to_owned()))
        } else {
            Err(format!("{input} is not a valid email address."))
        }
    }
}

impl AsRef<str> for WaitlistEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WaitlistEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The loose `\S+@\S+.\S+` shape check shared by the endpoint and the
/// client form: no whitespace anywhere, at least one character before an
/// `@`, and somewhere after it a `.` with at least one character on each
/// side.
pub fn matches_permissive_shape(s: &str) -> bool {
    if s.is_empty() || s.chars().any(char::is_whitespace) {
        return false;
    }
    for (at, _) in s.match_indices('@') {
        if at == 0 {
            continue;
        }
        let domain = &s[at + 1..];
        if domain
            .match_indices('.')
            .any(|(dot, _)| dot > 0 && dot + 1 < domain.len())
        {
            return true;
        }
    }
    false
}
