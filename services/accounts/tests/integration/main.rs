
mod flow_test;
mod user_test;
mod verify_code_test;
