#![warn(clippy::print_stdout)]
#![warn(clippy::cast_lossless)]

mod app;
mod collaborators;
mod datetime;
mod gather;
mod path_template;
mod transfer;

fn main() {
    let return_code = app::run_app();
    std::process::exit(return_code)
}
