use std::path::PathBuf;

use clap::Args;
use eac_cvc::{CertificateRequest, CvCertificate};
use tracing::warn;

use crate::util::read_der;

/// Arguments of the `verify` command
#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    /// Certificate request to check
    #[arg(required = true)]
    pub request: PathBuf,

    /// Certificate whose key made the outer signature
    #[arg(long)]
    pub signer: Option<PathBuf>,

    /// Certificate supplying the domain parameters of the signer key
    #[arg(long, requires = "signer")]
    pub domain: Option<PathBuf>,
}

/// Verify the inner signature and, given the signer certificate, the outer one
pub fn verify_command(args: &VerifyArgs) -> eyre::Result<()> {
    let request = CertificateRequest::from_der(&read_der(&args.request)?)?;
    request.verify_inner_signature()?;
    println!("Inner signature of {} is valid", request.holder_reference()?);

    let Some(signer) = &args.signer else {
        return Ok(());
    };
    let signer = CvCertificate::from_der(&read_der(signer)?)?;
    let domain = args
        .domain
        .as_deref()
        .map(|path| eyre::Ok(CvCertificate::from_der(&read_der(path)?)?.domain_parameters()?))
        .transpose()?;

    let signer_chr = signer.holder_reference()?;
    if request.outer_authority_reference().as_deref() != Some(signer_chr.as_str()) {
        warn!(
            signer = %signer_chr,
            car = ?request.outer_authority_reference(),
            "outer CAR does not name the signer"
        );
    }
    request.verify_outer_signature(&signer.public_key(domain.as_ref())?)?;
    println!("Outer signature by {signer_chr} is valid");
    Ok(())
}
