use std::{fmt::Write, path::Path};

use eac_asn1::Asn1;
use eac_cvc::{CertificateRequest, CvCertificate, constants::TAG_CV_CERTIFICATE};

use crate::util::read_der;

/// Print the TLV tree and a summary of a certificate or request
pub fn inspect_command(file: &Path) -> eyre::Result<()> {
    let node = Asn1::parse(&read_der(file)?)?;
    print!("{}", dump(&node));
    println!();

    // a bare request shares the 7F21 tag, only certificates carry dates
    let certificate = if node.tag() == TAG_CV_CERTIFICATE {
        let certificate = CvCertificate::from_asn1(node.clone())?;
        certificate.effective_date()?.is_some().then_some(certificate)
    } else {
        None
    };

    match certificate {
        Some(certificate) => print_certificate(&certificate)?,
        None => print_request(&CertificateRequest::from_asn1(node)?)?,
    }
    Ok(())
}

fn print_certificate(certificate: &CvCertificate) -> eyre::Result<()> {
    println!("Certificate");
    println!("  CHR: {}", certificate.holder_reference()?);
    println!("  CAR: {}", certificate.authority_reference()?);
    println!("  Algorithm: {}", certificate.public_key_oid()?);
    if let Some(date) = certificate.effective_date()? {
        println!("  Effective: {date}");
    }
    if let Some(date) = certificate.expiration_date()? {
        println!("  Expires: {date}");
    }
    if let Some(chat) = certificate.chat()? {
        println!(
            "  CHAT: {} {}",
            chat.role(),
            hex::encode_upper(chat.authorization())
        );
    }
    Ok(())
}

fn print_request(request: &CertificateRequest) -> eyre::Result<()> {
    println!("Certificate request ({:?}, {:?})", request.shape(), request.state());
    println!("  CHR: {}", request.holder_reference()?);
    if let Some(car) = request.authority_reference() {
        println!("  CAR: {car}");
    }
    if let Some(car) = request.outer_authority_reference() {
        println!("  Outer CAR: {car}");
    }
    println!("  Algorithm: {}", request.public_key()?.oid());
    Ok(())
}

/// Indented TLV tree, primitive values in hex
pub fn dump(node: &Asn1) -> String {
    let mut out = String::new();
    dump_into(node, 0, &mut out);
    out
}

fn dump_into(node: &Asn1, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    if node.is_constructed() {
        let _ = writeln!(out, "{indent}{} [{}]", node.tag(), node.value_len());
        for child in node.children() {
            dump_into(child, depth + 1, out);
        }
    } else {
        let _ = writeln!(
            out,
            "{indent}{} [{}] {}",
            node.tag(),
            node.value_len(),
            hex::encode_upper(node.value())
        );
    }
}
