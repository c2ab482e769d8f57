use crate::error::AppError;
use crate::upload::oci::auth::OciIdentity;
use base64ct::{Base64, Encoding};
use rsa::Pkcs1v15Sign;
use sha2::{Digest, Sha256};

/// Hand-rolled OCI "Signing Requests" signer: builds the signing string
/// from a fixed header set, signs it RSA-SHA256, and emits the
/// `Authorization` header value. Mirrors the shape of the teacher's AWS
/// SigV4 signer (canonical request → string to sign → signature) without
/// the canonicalization machinery AWS needs — OCI signs literal header
/// lines, not a derived canonical request.
pub struct Signer {
    identity: OciIdentity,
}

pub struct SignedRequest {
    pub authorization: String,
    pub date: String,
    pub x_content_sha256: Option<String>,
    pub content_length: Option<usize>,
}

impl Signer {
    #[must_use]
    pub const fn new(identity: OciIdentity) -> Self {
        Self { identity }
    }

    /// Signs `method path_and_query` against `host`, optionally over a
    /// body. `date` must be an RFC 1123 timestamp matching the `Date`
    /// header sent with the request.
    ///
    /// # Errors
    /// Returns `AppError::AuthFailed` if RSA signing fails.
    pub fn sign(
        &self,
        method: &str,
        path_and_query: &str,
        host: &str,
        date: &str,
        body: Option<&[u8]>,
    ) -> Result<SignedRequest, AppError> {
        let mut headers = vec!["(request-target)", "date", "host"];
        let mut lines = vec![
            format!("(request-target): {} {path_and_query}", method.to_lowercase()),
            format!("date: {date}"),
            format!("host: {host}"),
        ];

        let (x_content_sha256, content_length) = if let Some(body) = body {
            let digest = Sha256::digest(body);
            let encoded = Base64::encode_string(&digest);
            headers.extend(["content-length", "content-type", "x-content-sha256"]);
            lines.push(format!("content-length: {}", body.len()));
            lines.push("content-type: application/json".to_string());
            lines.push(format!("x-content-sha256: {encoded}"));
            (Some(encoded), Some(body.len()))
        } else {
            (None, None)
        };

        let signing_string = lines.join("\n");
        let digest = Sha256::digest(signing_string.as_bytes());
        let signature = self
            .identity
            .private_key
            .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
            .map_err(|e| AppError::AuthFailed(format!("rsa signing failed: {e}")))?;
        let signature_b64 = Base64::encode_string(&signature);

        let authorization = format!(
            "Signature version=\"1\",headers=\"{}\",keyId=\"{}\",algorithm=\"rsa-sha256\",signature=\"{signature_b64}\"",
            headers.join(" "),
            self.identity.key_id(),
        );

        Ok(SignedRequest {
            authorization,
            date: date.to_string(),
            x_content_sha256,
            content_length,
        })
    }
}
