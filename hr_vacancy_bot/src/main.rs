use hr_bot_commons::*;

fn main() {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "warn,hr_vacancy_bot=debug");
    }
    start_everything(hr_vacancy_bot::entry());
}
