/// Display version information
pub fn execute() {
    println!("daoctl {}", env!("CARGO_PKG_VERSION"));
    println!("Client for an NFT-gated governance DAO");
}
