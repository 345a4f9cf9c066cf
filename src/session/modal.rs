//! Login / sign-up modal visibility.
//!
//! Fields are private so the only way to change them is through the
//! transitions below, which keep at most one modal open.

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModalState {
    login_visible: bool,
    signup_visible: bool,
}

impl ModalState {
    #[must_use]
    pub fn login_visible(&self) -> bool {
        self.login_visible
    }

    #[must_use]
    pub fn signup_visible(&self) -> bool {
        self.signup_visible
    }

    #[must_use]
    pub fn any_visible(&self) -> bool {
        self.login_visible || self.signup_visible
    }

    pub fn open_login(&mut self) {
        self.login_visible = true;
        self.signup_visible = false;
    }

    pub fn close_login(&mut self) {
        self.login_visible = false;
    }

    pub fn open_signup(&mut self) {
        self.signup_visible = true;
        self.login_visible = false;
    }

    pub fn close_signup(&mut self) {
        self.signup_visible = false;
    }

    pub fn close_all(&mut self) {
        self.login_visible = false;
        self.signup_visible = false;
    }
}

#[cfg(test)]
#[path = "modal_test.rs"]
mod tests;
