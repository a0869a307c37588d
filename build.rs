fn main() {
    // Only meaningful when building for ESP-IDF; emits nothing on the host.
    embuild::espidf::sysenv::output();
}
