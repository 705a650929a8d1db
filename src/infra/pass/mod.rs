pub mod link_signer;
pub mod qr_renderer;
