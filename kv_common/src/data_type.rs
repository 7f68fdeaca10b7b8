use bitflags::bitflags;

bitflags! {
    /// DataType is used to communicate how the client and server should encode and decode a value
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct DataType: u8 {
        const RAW = 0x00;
        const JSON = 0x01;
    }
}

impl Default for DataType {
    fn default() -> Self {
        DataType::RAW
    }
}
