use std::io;

fn main() -> io::Result<()> {
    let _logging = phpdojo::logging::init();
    phpdojo::tui::run()
}
