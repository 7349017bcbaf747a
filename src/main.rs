#![forbid(unsafe_code)]

use cordova_apple::{cli::Input, util::cli};

fn main() {
    cli::exec::<Input>()
}
