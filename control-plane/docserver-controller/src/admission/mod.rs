//! Admission boundary for DocServer: defaulting, validation and the
//! AdmissionReview handling behind the mutating and validating webhooks.
//!
//! The reconcile engine never calls into this module; it assumes admitted
//! objects and re-applies its own defaults when rendering.

use std::fmt;
use std::sync::LazyLock;

use json_patch::Patch;
use kube::ResourceExt;
use kube::core::DynamicObject;
use kube::core::admission::{
    AdmissionRequest, AdmissionResponse, AdmissionReview,
    ConvertAdmissionReviewError,
};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::crd::DocServer;
use crate::crd::docserver::{
    DEFAULT_BRANCH, DEFAULT_DEPTH, DEFAULT_SERVER_IMAGE, DocServerSpec,
};

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https|ssh).*\.git").expect("invalid url regex")
});

#[derive(thiserror::Error, Debug)]
pub enum AdmissionError {
    #[error("invalid admission review: {0}")]
    Review(#[from] ConvertAdmissionReviewError),
    #[error("object is not a DocServer: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One rejected field, rendered like the API server's field errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub path: String,
    pub value: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: Invalid value: {:?}: {}",
            self.path, self.value, self.message
        )
    }
}

/// Fill the defaults a mutating admission step would set.
pub fn default_descriptor(mut spec: DocServerSpec) -> DocServerSpec {
    if spec.image.as_deref().is_none_or(str::is_empty) {
        spec.image = Some(DEFAULT_SERVER_IMAGE.to_string());
    }
    if spec.target.branch.as_deref().is_none_or(str::is_empty) {
        spec.target.branch = Some(DEFAULT_BRANCH.to_string());
    }
    if spec.target.ssl_verify.is_none() {
        spec.target.ssl_verify = Some(true);
    }
    if spec.target.depth <= 0 {
        spec.target.depth = DEFAULT_DEPTH;
    }
    spec
}

pub fn validate_descriptor(ds: &DocServer) -> Vec<FieldError> {
    let mut errs = Vec::new();
    let url = &ds.spec.target.url;
    if !URL_PATTERN.is_match(url) {
        errs.push(FieldError {
            path: "spec.target.url".to_string(),
            value: url.clone(),
            message: "Url must start with https or ssh and end with .git."
                .to_string(),
        });
    }
    errs
}

fn denial_message(name: &str, errs: &[FieldError]) -> String {
    let details = errs
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "DocServer.update.git-ogawa.github.io {:?} is invalid: {}",
        name, details
    )
}

fn decode(obj: &DynamicObject) -> Result<DocServer, AdmissionError> {
    Ok(serde_json::from_value(serde_json::to_value(obj)?)?)
}

/// JSON patch taking the submitted object to its defaulted form.
pub fn default_patch(obj: &DynamicObject) -> Result<Patch, AdmissionError> {
    let ds = decode(obj)?;
    let original = serde_json::to_value(obj)?;
    let mut defaulted = original.clone();
    defaulted["spec"] = serde_json::to_value(default_descriptor(ds.spec))?;
    Ok(json_patch::diff(&original, &defaulted))
}

fn into_request(
    review: AdmissionReview<DynamicObject>,
) -> Result<AdmissionRequest<DynamicObject>, AdmissionReview<DynamicObject>> {
    review.try_into().map_err(|err: ConvertAdmissionReviewError| {
        let err = AdmissionError::from(err);
        warn!(error = %err, "rejecting malformed admission review");
        AdmissionResponse::invalid(err.to_string()).into_review()
    })
}

/// Answer a mutating AdmissionReview with the defaulting patch.
pub fn mutate_review(
    review: AdmissionReview<DynamicObject>,
) -> AdmissionReview<DynamicObject> {
    let req = match into_request(review) {
        Ok(req) => req,
        Err(rejected) => return rejected,
    };
    let res = AdmissionResponse::from(&req);
    let Some(obj) = req.object.as_ref() else {
        return res.into_review();
    };
    let name = obj.name_any();

    let patch = match default_patch(obj) {
        Ok(patch) => patch,
        Err(err) => {
            warn!(%name, error = %err, "denied: undecodable object");
            return res.deny(err.to_string()).into_review();
        }
    };
    debug!(%name, ops = patch.0.len(), "defaulting");
    match res.clone().with_patch(patch) {
        Ok(res) => res.into_review(),
        Err(err) => {
            warn!(%name, error = %err, "failed to encode defaulting patch");
            res.deny(err.to_string()).into_review()
        }
    }
}

/// Answer a validating AdmissionReview for DocServer create/update.
pub fn validate_review(
    review: AdmissionReview<DynamicObject>,
) -> AdmissionReview<DynamicObject> {
    let req = match into_request(review) {
        Ok(req) => req,
        Err(rejected) => return rejected,
    };

    let res = AdmissionResponse::from(&req);
    // Deletes carry no object and are always allowed.
    let Some(obj) = req.object.as_ref() else {
        return res.into_review();
    };
    let name = obj.name_any();

    let ds = match decode(obj) {
        Ok(ds) => ds,
        Err(err) => {
            warn!(%name, error = %err, "denied: undecodable object");
            return res.deny(err.to_string()).into_review();
        }
    };

    let errs = validate_descriptor(&ds);
    if errs.is_empty() {
        info!(operation = ?req.operation, %name, "accepted");
        res.into_review()
    } else {
        let msg = denial_message(&name, &errs);
        warn!(operation = ?req.operation, %name, reason = %msg, "denied");
        res.deny(msg).into_review()
    }
}
