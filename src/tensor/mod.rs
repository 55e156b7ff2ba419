pub mod tensor;
pub mod tensor_desc;
