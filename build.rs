fn main() {
    // The ESP-IDF link environment is only needed when the firmware binary is
    // built; host builds of the library and tests skip it.
    if std::env::var("CARGO_FEATURE_ESPIDF").is_ok() {
        embuild::espidf::sysenv::output();
    }
}
