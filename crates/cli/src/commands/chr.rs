use eac_cvc::generator::generate_new_chr;

/// Print the holder reference following `chr`
pub fn next_chr_command(chr: &str, sequence: Option<u32>) -> eyre::Result<()> {
    println!("{}", generate_new_chr(chr, sequence)?);
    Ok(())
}
