use crate::units::{bash, dirlist, ssh, systeminfo, volatile, UnitDescriptor};

/// Every unit shipped with the collector, in catalog order
pub const BUILTIN_UNITS: &[UnitDescriptor] = &[
    volatile::pslist::DESCRIPTOR,
    volatile::netstat::DESCRIPTOR,
    bash::DESCRIPTOR,
    dirlist::DESCRIPTOR,
    ssh::DESCRIPTOR,
    systeminfo::DESCRIPTOR,
];
