use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use crate::SourceKind;

pub const LABEL_DOMAIN: &str = "experiment-controller.example.com";
pub const MANAGED_BY_VALUE: &str = "experiment-controller";
pub const ROLE_EXPERIMENT: &str = "experiment";

/// A label key under the controller's domain, rendered as `<domain>/<name>`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExpdepLabel<'a>(Cow<'a, str>);

impl<'a> ExpdepLabel<'a> {
    pub fn new(name: impl ToString) -> ExpdepLabel<'static> {
        ExpdepLabel(Cow::Owned(name.to_string()))
    }

    pub const fn borrow(name: &'a str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub const CR_NAME: ExpdepLabel<'static> = ExpdepLabel::borrow("cr-name");
    pub const ROLE: ExpdepLabel<'static> = ExpdepLabel::borrow("role");
    pub const MANAGED_BY: ExpdepLabel<'static> = ExpdepLabel::borrow("managed-by");

    pub fn source_name(kind: SourceKind) -> ExpdepLabel<'static> {
        Self::new(format!("source-{}-name", kind.as_ref().to_lowercase()))
    }
}

impl fmt::Display for ExpdepLabel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{LABEL_DOMAIN}/{}", self.0)
    }
}

/// Labels stamped on the derived pod template on top of the source's own labels.
pub fn pod_template_labels(
    cr_name: &str,
    kind: SourceKind,
    source_name: &str,
) -> BTreeMap<String, String> {
    [
        (ExpdepLabel::CR_NAME.to_string(), cr_name.to_string()),
        (ExpdepLabel::ROLE.to_string(), ROLE_EXPERIMENT.to_string()),
        (
            ExpdepLabel::source_name(kind).to_string(),
            source_name.to_string(),
        ),
    ]
    .into_iter()
    .collect()
}

/// Labels on the derived object itself.
pub fn object_labels(cr_name: &str) -> BTreeMap<String, String> {
    [
        (
            ExpdepLabel::MANAGED_BY.to_string(),
            MANAGED_BY_VALUE.to_string(),
        ),
        (ExpdepLabel::CR_NAME.to_string(), cr_name.to_string()),
    ]
    .into_iter()
    .collect()
}
