//! Site identity derivation and request validation.
//!
//! Every resource of a site is named and labelled after the first label of its
//! domain name, which is how deprovisioning finds what provisioning created.

use api::SiteRequest;

use crate::resource_creator::tls_secret_name;
use crate::{Error, Result};

const MAX_LABEL_LENGTH: usize = 63;
const MAX_DOMAIN_LENGTH: usize = 253;

/// Returns the part of `domain_name` before its first `.`, or all of it if there is none.
pub fn derive_identity(domain_name: &str) -> &str {
    domain_name
        .split_once('.')
        .map_or(domain_name, |(head, _)| head)
}

/// Validates the domain name and returns the identity derived from it.
pub fn site_identity(domain_name: &str) -> Result<String> {
    validate_domain_name(domain_name)?;
    Ok(derive_identity(domain_name).to_string())
}

/// Validates both fields of a provision request and returns the site identity.
pub fn validate_request(request: &SiteRequest) -> Result<String> {
    if request.site_id.is_empty() {
        return Err(Error::invalid_request("websiteId must not be empty"));
    }
    validate_label_value("websiteId", &request.site_id)?;
    site_identity(&request.domain_name)
}

/// Checks that `value` can be used as a label value.
pub fn validate_label_value(field: &str, value: &str) -> Result<()> {
    if value.len() > MAX_LABEL_LENGTH {
        return Err(Error::invalid_request(format!(
            "{field} must be at most {MAX_LABEL_LENGTH} characters"
        )));
    }
    let inner_ok = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    let ends_ok = match (value.chars().next(), value.chars().last()) {
        (Some(first), Some(last)) => first.is_ascii_alphanumeric() && last.is_ascii_alphanumeric(),
        _ => true,
    };
    if !inner_ok || !ends_ok {
        return Err(Error::invalid_request(format!(
            "{field} {value:?} is not a valid label value"
        )));
    }
    Ok(())
}

fn validate_domain_name(domain_name: &str) -> Result<()> {
    if domain_name.is_empty() {
        return Err(Error::invalid_request("domainName must not be empty"));
    }
    if domain_name.len() > MAX_DOMAIN_LENGTH {
        return Err(Error::invalid_request(format!(
            "domainName must be at most {MAX_DOMAIN_LENGTH} characters"
        )));
    }
    // The TLS secret name is prefixed, and is bounded by the same limit.
    let secret_name = tls_secret_name(domain_name);
    if secret_name.len() > MAX_DOMAIN_LENGTH {
        return Err(Error::invalid_request(format!(
            "domainName is too long for TLS secret {secret_name:?}"
        )));
    }
    if !domain_name.contains('.') {
        return Err(Error::invalid_request(format!(
            "domainName {domain_name:?} must contain at least one '.'"
        )));
    }
    if let Some(label) = domain_name.split('.').find(|label| !is_dns_label(label)) {
        return Err(Error::invalid_request(format!(
            "domainName {domain_name:?} has invalid label {label:?}"
        )));
    }
    Ok(())
}

/// RFC 1123 label: lowercase alphanumerics and `-`, alphanumeric at both ends.
fn is_dns_label(label: &str) -> bool {
    let bytes = label.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            bytes.len() <= MAX_LABEL_LENGTH
                && first.is_ascii_alphanumeric()
                && last.is_ascii_alphanumeric()
                && bytes
                    .iter()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case::subdomain("foo.example.com", "foo")]
    #[case::apex("example.com", "example")]
    #[case::deep("www.shop.example.org", "www")]
    #[case::no_dot("localhost", "localhost")]
    #[case::leading_dot(".example.com", "")]
    #[case::empty("", "")]
    fn derives_identity(#[case] domain_name: &str, #[case] expected: &str) {
        assert_eq!(derive_identity(domain_name), expected);
        assert_eq!(derive_identity(domain_name), derive_identity(domain_name));
    }

    #[rstest]
    #[case::subdomain("foo.example.com", "foo")]
    #[case::digits_and_dashes("shop-2.example.com", "shop-2")]
    #[case::longest(&format!("{}example.com", "abcdefghi.".repeat(23)), "abcdefghi")]
    fn accepts_valid_domains(#[case] domain_name: &str, #[case] expected: &str) {
        assert_eq!(site_identity(domain_name).unwrap(), expected);
    }

    #[rstest]
    #[case::empty("")]
    #[case::no_dot("localhost")]
    #[case::leading_dot(".example.com")]
    #[case::trailing_dot("foo.example.com.")]
    #[case::empty_label("foo..example.com")]
    #[case::uppercase("Foo.example.com")]
    #[case::leading_dash("-foo.example.com")]
    #[case::underscore("foo_bar.example.com")]
    #[case::too_long_label(&format!("{}.example.com", "a".repeat(64)))]
    #[case::too_long_for_secret(&format!("{}xexample.com", "abcdefghi.".repeat(23)))]
    #[case::too_long(&format!("{}example.com", "abcdefghi.".repeat(25)))]
    fn rejects_invalid_domains(#[case] domain_name: &str) {
        let err = site_identity(domain_name).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)), "{err:?}");
    }

    #[rstest]
    #[case::plain("S1", true)]
    #[case::uuid("3f2b8c1e-7a4d-4e4b-9f0a-2c6d1e8b5a90", true)]
    #[case::dotted("site.v2_a", true)]
    #[case::leading_dash("-S1", false)]
    #[case::space("S 1", false)]
    #[case::too_long(&"a".repeat(64), false)]
    fn validates_label_values(#[case] value: &str, #[case] valid: bool) {
        assert_eq!(validate_label_value("websiteId", value).is_ok(), valid);
    }

    #[test]
    fn longest_domain_fits_secret_name() {
        let domain_name = format!("{}example.com", "abcdefghi.".repeat(23));
        assert_eq!(domain_name.len(), 241);
        assert!(site_identity(&domain_name).is_ok());
        assert_eq!(tls_secret_name(&domain_name).len(), MAX_DOMAIN_LENGTH);
        assert!(site_identity(&format!("x{domain_name}")).is_err());
    }

    #[test]
    fn request_requires_site_id() {
        let err = validate_request(&SiteRequest::new("foo.example.com", "")).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn request_yields_identity() {
        let identity = validate_request(&SiteRequest::new("foo.example.com", "S1")).unwrap();
        assert_eq!(identity, "foo");
    }
}
