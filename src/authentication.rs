//! SMTP authentication credentials.

/// Username/password pair for AUTH PLAIN.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new<S: Into<String>, T: Into<String>>(username: S, password: T) -> Credentials {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl<S: Into<String>, T: Into<String>> From<(S, T)> for Credentials {
    fn from((username, password): (S, T)) -> Credentials {
        Credentials::new(username.into(), password.into())
    }
}
