pub mod swift_code;
