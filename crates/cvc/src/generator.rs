//! Certificate request generation
//!
//! [`CvcRequestGenerator::generate`] turns a root certificate template and,
//! for renewals, the holder's current certificate into a signed request:
//!
//! 1. strip the template of everything the issuer decides (CAR, dates, CHAT)
//! 2. derive the next holder reference
//! 3. carry over the extensions of the current certificate and bind the
//!    certificate description by its hash
//! 4. provision the new key and sign the body with it
//! 5. sign the authentication wrapper with a key the issuer already trusts,
//!    or send a bare request if there is none
//!
//! Every step reports failures tagged with a [`Stage`].

use std::fmt;

use eac_asn1::{Asn1, Oid};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::{
    certificate::CvCertificate,
    chat::Chat,
    constants::*,
    description::CertificateDescription,
    error::{Error, Result, ResultExt},
    key::EcPrivateKey,
    key_service::{KeyService, SoftwareKeyService},
    keypair::{CvcKeyPairBuilder, KeyDisposition},
    path::request,
    request::CertificateRequest,
};

/// Digits of the holder reference counter, highest first
const CHR_CHARSET: [char; 10] = ['9', '8', '7', '6', '5', '4', '3', '2', '1', '0'];

/// Length of the counter at the end of a holder reference
const CHR_COUNTER_LEN: usize = 5;

/// Step of request generation, carried by [`Error::Stage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Reading the holder reference of the current certificate
    ReadHolderReference,
    /// Copying extensions from the current certificate
    CopyExtensions,
    /// Deriving the request template from the root certificate
    CleanRequest,
    /// Writing the new holder reference
    SetHolderReference,
    /// Provisioning the key and signing the body
    SetSignature,
    /// Binding the certificate description
    SetDescription,
    /// Signing the authentication wrapper
    SetOuterSignature,
    /// Reading the CHAT of the current certificate
    ReadChat,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ReadHolderReference => {
                "reading CHR from old certificate failed, possibly corrupted"
            }
            Self::CopyExtensions => "copying extensions from old certificate to request failed",
            Self::CleanRequest => {
                "creating clean request failed - probably given root certificate corrupted"
            }
            Self::SetHolderReference => "setting holder reference failed",
            Self::SetSignature => "setting signature failed",
            Self::SetDescription => "setting certificate description failed",
            Self::SetOuterSignature => "setting outer signature failed",
            Self::ReadChat => "reading CHAT from old certificate failed, possibly corrupted",
        })
    }
}

/// Holder reference and CHAT for requests without a current certificate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdditionalCvcRequestInput {
    /// Holder reference to request, used verbatim
    pub holder_reference: Option<String>,
    /// Authorization to request
    pub chat: Option<Chat>,
}

impl AdditionalCvcRequestInput {
    /// The holder reference, an empty one counts as absent
    fn holder_reference(&self) -> Option<&str> {
        self.holder_reference.as_deref().filter(|chr| !chr.is_empty())
    }

    fn is_complete(&self) -> bool {
        self.holder_reference().is_some() && self.chat.is_some()
    }
}

/// Inputs of a request generation
#[derive(Debug, Clone, Copy)]
pub struct RequestParameters<'a> {
    /// Certificate the request is derived from
    pub root_cvc: &'a CvCertificate,
    /// Current certificate of the holder, absent for a first request
    pub old_cvc: Option<&'a CvCertificate>,
    /// Private key of the current certificate, if not held by the key service
    pub old_private_key: Option<&'a EcPrivateKey>,
    /// Description to bind into the extensions
    pub description: Option<&'a CertificateDescription>,
    /// Explicit holder reference and CHAT
    pub additional_input: Option<&'a AdditionalCvcRequestInput>,
    /// Sign with the key already stored under the new holder reference
    pub use_present_key: bool,
    /// Alias of a request signer certificate for the outer signature
    pub rsc_alias: Option<&'a str>,
    /// Private key of the request signer, if not held by the key service
    pub rsc_private_key: Option<&'a EcPrivateKey>,
    /// Sequence number for the new holder reference
    pub next_sequence_number: Option<u32>,
}

impl<'a> RequestParameters<'a> {
    /// Parameters for a request derived from `root_cvc` with nothing else set
    pub const fn new(root_cvc: &'a CvCertificate) -> Self {
        Self {
            root_cvc,
            old_cvc: None,
            old_private_key: None,
            description: None,
            additional_input: None,
            use_present_key: false,
            rsc_alias: None,
            rsc_private_key: None,
            next_sequence_number: None,
        }
    }
}

/// A generated request with everything the caller has to keep
#[derive(Debug, Clone)]
pub struct CvcRequestData {
    /// Description bound into the request
    pub description: Option<CertificateDescription>,
    /// Requested authorization
    pub chat: Chat,
    /// The signed request
    pub request: CertificateRequest,
    /// PKCS#8 encoding of the new private key, if the key service handed it out
    pub private_key_pkcs8: Option<Zeroizing<Vec<u8>>>,
}

/// Increase the five digit counter at the end of a holder reference
///
/// `"99999"` wraps to `"00001"`. Characters that are not digits count as
/// `'9'` and carry.
pub fn increase_chr(chr: &str) -> Result<String> {
    let (prefix, counter) = split_counter(chr)?;
    let next: String = if counter.iter().all(|c| *c == '9') {
        "00001".to_string()
    } else {
        increase_counter(&counter).into_iter().collect()
    };
    Ok(format!("{prefix}{next}"))
}

fn increase_counter(counter: &[char]) -> Vec<char> {
    let Some((last, prefix)) = counter.split_last() else {
        return Vec::new();
    };
    match CHR_CHARSET.iter().position(|c| c == last) {
        Some(index) if index > 0 => {
            let mut out = prefix.to_vec();
            out.push(CHR_CHARSET[index - 1]);
            out
        }
        _ if prefix.is_empty() => vec![CHR_CHARSET[CHR_CHARSET.len() - 1]],
        _ => {
            let mut out = increase_counter(prefix);
            out.push(CHR_CHARSET[CHR_CHARSET.len() - 1]);
            out
        }
    }
}

/// Replace the counter at the end of a holder reference with `number`
pub fn change_number_of_chr(chr: &str, number: u32) -> Result<String> {
    let (prefix, _) = split_counter(chr)?;
    Ok(format!("{prefix}{number:05}"))
}

/// Next holder reference after `chr`, by sequence number if one is given
pub fn generate_new_chr(chr: &str, next_sequence_number: Option<u32>) -> Result<String> {
    match next_sequence_number {
        Some(number) => change_number_of_chr(chr, number),
        None => increase_chr(chr),
    }
}

fn split_counter(chr: &str) -> Result<(String, Vec<char>)> {
    let chars: Vec<char> = chr.chars().collect();
    if chars.len() < CHR_COUNTER_LEN {
        return Err(Error::InvalidHolderReference(chr.to_string()));
    }
    let (prefix, counter) = chars.split_at(chars.len() - CHR_COUNTER_LEN);
    Ok((prefix.iter().collect(), counter.to_vec()))
}

/// Builds certificate requests, signing with keys from a key service
pub struct CvcRequestGenerator<'a> {
    service: &'a dyn KeyService,
}

impl fmt::Debug for CvcRequestGenerator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CvcRequestGenerator").finish_non_exhaustive()
    }
}

impl<'a> CvcRequestGenerator<'a> {
    /// Create a generator over `service`
    pub const fn new(service: &'a dyn KeyService) -> Self {
        Self { service }
    }

    /// Generate a signed certificate request
    ///
    /// Requires the holder's current certificate or additional input with
    /// both a holder reference and a CHAT.
    pub fn generate(&self, params: &RequestParameters<'_>) -> Result<CvcRequestData> {
        let additional = params.additional_input;
        if params.old_cvc.is_none() && !additional.is_some_and(AdditionalCvcRequestInput::is_complete) {
            return Err(Error::MissingInput(
                "old certificate or holder reference and CHAT",
            ));
        }

        let old_chr = params
            .old_cvc
            .map(CvCertificate::holder_reference)
            .transpose()
            .stage(Stage::ReadHolderReference)?;

        let (mut request, root_chr) = clean_request(params.root_cvc).stage(Stage::CleanRequest)?;

        let chr = match (additional.and_then(AdditionalCvcRequestInput::holder_reference), &old_chr) {
            (Some(chr), _) => chr.to_string(),
            (None, Some(old)) => {
                generate_new_chr(old, params.next_sequence_number).stage(Stage::SetHolderReference)?
            }
            (None, None) => return Err(Error::MissingInput("holder reference")),
        };
        request
            .set_request_part_value(&request::HOLDER_REFERENCE, chr.as_bytes())
            .stage(Stage::SetHolderReference)?;
        debug!(%chr, old = ?old_chr, "holder reference");

        if let Some(old) = params.old_cvc {
            copy_extensions(&mut request, old).stage(Stage::CopyExtensions)?;
        }
        if let Some(description) = params.description {
            set_description(&mut request, description, params.root_cvc)
                .stage(Stage::SetDescription)?;
        }

        let disposition = if params.use_present_key {
            KeyDisposition::UsePresent
        } else if params.old_cvc.is_none() {
            KeyDisposition::Replace
        } else {
            KeyDisposition::GenerateIfNotPresent
        };
        let key_pair = CvcKeyPairBuilder::new(self.service)
            .issuer_alias(&root_chr)
            .key_pair(params.root_cvc, &chr, disposition)
            .stage(Stage::SetSignature)?;
        request
            .sign_inner_body(&key_pair.public, &chr, self.service)
            .stage(Stage::SetSignature)?;
        request.verify_inner_signature().stage(Stage::SetSignature)?;

        let chat = match additional.and_then(|a| a.chat.clone()) {
            Some(chat) => chat,
            None => params
                .old_cvc
                .map(CvCertificate::chat)
                .transpose()
                .map(Option::flatten)
                .stage(Stage::ReadChat)?
                .ok_or(Error::MissingElement("CHAT"))
                .stage(Stage::ReadChat)?,
        };

        let request = match (params.rsc_alias, params.old_cvc, &old_chr) {
            (Some(rsc_alias), _, _) => self
                .sign_outer(request, rsc_alias, params.rsc_private_key, &TA_ECDSA_SHA_256)
                .stage(Stage::SetOuterSignature)?,
            (None, Some(old), Some(old_chr)) => {
                let oid = old.public_key_oid().stage(Stage::SetOuterSignature)?;
                self.sign_outer(request, old_chr, params.old_private_key, &oid)
                    .stage(Stage::SetOuterSignature)?
            }
            _ => request.into_bare(),
        };

        let private_key_pkcs8 = key_pair
            .private
            .as_ref()
            .map(EcPrivateKey::to_pkcs8)
            .transpose()
            .stage(Stage::SetSignature)?;

        info!(%chr, shape = ?request.shape(), ?disposition, "generated certificate request");
        Ok(CvcRequestData {
            description: params.description.cloned(),
            chat,
            request,
            private_key_pkcs8,
        })
    }

    /// Add the outer CA reference `alias` and sign with the matching key
    ///
    /// A raw `key` is only held for the duration of the signature.
    fn sign_outer(
        &self,
        mut request: CertificateRequest,
        alias: &str,
        key: Option<&EcPrivateKey>,
        oid: &Oid,
    ) -> Result<CertificateRequest> {
        request.set_outer_authority_reference(alias)?;
        match key {
            Some(key) => {
                let local = SoftwareKeyService::new();
                local.import_private_key(alias, key.clone(), true)?;
                request.sign_outer(Some(alias), oid, &local)?;
            }
            None => request.sign_outer(Some(alias), oid, self.service)?,
        }
        debug!(alias, "outer signature");
        Ok(request)
    }
}

/// Root certificate without its issuer-assigned elements, wrapped in `67`
fn clean_request(root: &CvCertificate) -> Result<(CertificateRequest, String)> {
    let root_chr = root.holder_reference()?;
    let mut request = CertificateRequest::from_asn1(Asn1::constructed(
        TAG_AUTHENTICATION,
        vec![root.as_asn1().clone()],
    ))?;
    for path in [
        &request::CA_REFERENCE,
        &request::EFFECTIVE_DATE,
        &request::EXPIRATION_DATE,
        &request::CHAT,
        &request::SIGNATURE,
    ] {
        request.remove_request_part(path)?;
    }
    Ok((request, root_chr))
}

/// Replace the template's extensions with those of `old`
fn copy_extensions(request: &mut CertificateRequest, old: &CvCertificate) -> Result<()> {
    request.remove_request_part(&request::CERTIFICATE_EXTENSIONS)?;
    if let Some(extensions) = old.extensions() {
        request.add_request_part(&request::CV_CERTIFICATE_BODY, extensions.clone())?;
    }
    Ok(())
}

/// Bind `description` by its hash, leaving unrelated templates untouched
fn set_description(
    request: &mut CertificateRequest,
    description: &CertificateDescription,
    root: &CvCertificate,
) -> Result<()> {
    let hash = description.hash(root.signature_algorithm()?.hash());
    let slot_oid = |request: &CertificateRequest, path| {
        request
            .request_part(path)
            .map(Asn1::to_oid)
            .transpose()
    };

    if slot_oid(&*request, &request::DISCRETIONARY_DATA_FIRST_OID)? == Some(CERTIFICATE_DESCRIPTION) {
        request.set_request_part_value(&request::DISCRETIONARY_DATA_FIRST_HASH, &hash)?;
    } else if slot_oid(&*request, &request::DISCRETIONARY_DATA_SECOND_OID)?
        == Some(CERTIFICATE_DESCRIPTION)
    {
        request.set_request_part_value(&request::DISCRETIONARY_DATA_SECOND_HASH, &hash)?;
    } else {
        let template = Asn1::constructed(
            TAG_DISCRETIONARY_DATA_TEMPLATE,
            vec![
                Asn1::from_oid(&CERTIFICATE_DESCRIPTION),
                Asn1::primitive(TAG_EXTENSION_HASH, hash),
            ],
        );
        if request
            .request_part(&request::EXTENSIONS_DISCRETIONARY_DATA_FIRST)
            .is_some()
        {
            request.add_request_part(&request::CERTIFICATE_EXTENSIONS, template)?;
        } else {
            request.remove_request_part(&request::CERTIFICATE_EXTENSIONS)?;
            request.add_request_part(
                &request::CV_CERTIFICATE_BODY,
                Asn1::constructed(TAG_EXTENSIONS, vec![template]),
            )?;
        }
    }
    Ok(())
}
