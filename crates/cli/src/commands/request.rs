use std::path::{Path, PathBuf};

use clap::Args;
use eac_cvc::{
    AdditionalCvcRequestInput, Chat, CvCertificate, CvcRequestGenerator, EcPrivateKey, KeyService,
    RequestParameters, SoftwareKeyService,
};
use eyre::WrapErr;
use tracing::{debug, info};

use crate::{
    config::Config,
    util::{read_der, write_output},
};

/// Arguments of the `request` command
#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    /// Root certificate the request is derived from
    #[arg(long, required = true)]
    pub root: PathBuf,

    /// Current certificate of the holder, for renewals
    #[arg(long)]
    pub old: Option<PathBuf>,

    /// PKCS#8 private key of the current certificate
    #[arg(long, requires = "old")]
    pub old_key: Option<PathBuf>,

    /// Holder reference to request, overrides the derived one
    #[arg(long)]
    pub holder: Option<String>,

    /// CHAT to request as hex encoded 7F4C element
    #[arg(long)]
    pub chat: Option<String>,

    /// Alias of the request signer certificate for the outer signature
    #[arg(long)]
    pub rsc_alias: Option<String>,

    /// PKCS#8 private key of the request signer
    #[arg(long)]
    pub rsc_key: Option<PathBuf>,

    /// Sequence number for the new holder reference
    #[arg(short, long)]
    pub sequence: Option<u32>,

    /// Sign with the key already stored under the new holder reference
    #[arg(long)]
    pub use_present_key: bool,

    /// Output directory, overrides the configured one
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

fn read_private_key(path: &Path) -> eyre::Result<EcPrivateKey> {
    let bytes = read_der(path)?;
    EcPrivateKey::from_pkcs8(&bytes).wrap_err_with(|| format!("loading key {}", path.display()))
}

/// Load the configured keys into a fresh software key service
fn key_service(config: &Config) -> eyre::Result<SoftwareKeyService> {
    let service = SoftwareKeyService::new();
    for (alias, path) in &config.keys {
        service.import_private_key(alias, read_private_key(path)?, true)?;
        debug!(alias, path = %path.display(), "loaded key");
    }
    Ok(service)
}

/// Generate a request and write it with any new private key to the output directory
pub fn request_command(args: &RequestArgs, config: &Config) -> eyre::Result<()> {
    let root = CvCertificate::from_der(&read_der(&args.root)?)?;
    let old = args
        .old
        .as_deref()
        .map(|path| eyre::Ok(CvCertificate::from_der(&read_der(path)?)?))
        .transpose()?;
    let old_key = args.old_key.as_deref().map(read_private_key).transpose()?;
    let rsc_key = args.rsc_key.as_deref().map(read_private_key).transpose()?;

    let additional = if args.holder.is_some() || args.chat.is_some() {
        let chat = args
            .chat
            .as_deref()
            .map(|chat| eyre::Ok(Chat::from_der(&hex::decode(chat)?)?))
            .transpose()?;
        Some(AdditionalCvcRequestInput {
            holder_reference: args.holder.clone(),
            chat,
        })
    } else {
        None
    };
    let rsc_alias = args.rsc_alias.as_deref().or(config.rsc_alias.as_deref());

    let service = key_service(config)?;
    let params = RequestParameters {
        old_cvc: old.as_ref(),
        old_private_key: old_key.as_ref(),
        additional_input: additional.as_ref(),
        use_present_key: args.use_present_key,
        rsc_alias,
        rsc_private_key: rsc_key.as_ref(),
        next_sequence_number: args.sequence,
        ..RequestParameters::new(&root)
    };
    let data = CvcRequestGenerator::new(&service).generate(&params)?;

    let chr = data.request.holder_reference()?;
    let output = args.output.as_deref().unwrap_or(config.output_dir.as_path());
    let request_path = write_output(output, &format!("{chr}.cvreq"), &data.request.encode())?;
    info!(path = %request_path.display(), "wrote request");
    println!("Request for {chr} ({:?}) saved to {:?}", data.request.shape(), request_path);

    if let Some(pkcs8) = &data.private_key_pkcs8 {
        let key_path = write_output(output, &format!("{chr}.pkcs8"), pkcs8)?;
        println!("Private key saved to {key_path:?}");
    }
    if let Some(car) = data.request.outer_authority_reference() {
        println!("  Outer CAR: {car}");
    }
    Ok(())
}
