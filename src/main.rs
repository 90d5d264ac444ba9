use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    trickle::cli::main()
}
