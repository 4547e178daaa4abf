fn main() {
    #[cfg(all(feature = "bincode", feature = "messagepack"))]
    compile_error!("Cannot enable both 'bincode' and 'messagepack' features simultaneously");
}
