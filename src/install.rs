//! Installs the evaluator into a host environment that lacks native XPath.
use crate::evaluator::XPathEvaluator;
use log::debug;

/// An environment that may expose `document.evaluate`.
pub trait XPathHost {
    /// True if the host already evaluates XPath natively.
    fn has_native_xpath(&self) -> bool;

    /// The evaluator installed by [`install`], if any.
    fn xpath_evaluator(&self) -> Option<&XPathEvaluator>;

    fn install_xpath_evaluator(&mut self, evaluator: XPathEvaluator);
}

/// A minimal host: a native-support flag and a slot for an installed evaluator.
#[derive(Debug, Default, Clone)]
pub struct Window {
    native_xpath: bool,
    evaluator: Option<XPathEvaluator>,
}

impl Window {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_native_xpath() -> Self {
        Window {
            native_xpath: true,
            evaluator: None,
        }
    }
}

impl XPathHost for Window {
    fn has_native_xpath(&self) -> bool {
        self.native_xpath
    }

    fn xpath_evaluator(&self) -> Option<&XPathEvaluator> {
        self.evaluator.as_ref()
    }

    fn install_xpath_evaluator(&mut self, evaluator: XPathEvaluator) {
        self.evaluator = Some(evaluator);
    }
}

/// Installs an [`XPathEvaluator`] into `host` unless it has native XPath or
/// one is already installed. Returns whether anything was installed.
pub fn install<H: XPathHost + ?Sized>(host: &mut H) -> bool {
    if host.has_native_xpath() {
        debug!("host has native XPath support, skipping install");
        return false;
    }
    if host.xpath_evaluator().is_some() {
        debug!("XPath evaluator already installed");
        return false;
    }
    host.install_xpath_evaluator(XPathEvaluator::new());
    debug!("installed XPath evaluator");
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installs_once() {
        let mut window = Window::new();
        assert!(install(&mut window));
        assert!(window.xpath_evaluator().is_some());
        assert!(!install(&mut window));
    }

    #[test]
    fn native_hosts_are_left_alone() {
        let mut window = Window::with_native_xpath();
        assert!(!install(&mut window));
        assert!(window.xpath_evaluator().is_none());
    }
}
