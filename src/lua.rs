// src/lua.rs - Lua scripts for atomic broker transitions
use redis::Script;

pub struct LuaScripts {
    pub push: Script,
    pub lease: Script,
    pub ack: Script,
    pub nack: Script,
}

impl LuaScripts {
    pub fn new() -> Self {
        // Script hashes are computed here; the script body is only sent on a
        // NOSCRIPT miss.
        Self {
            push: Script::new(include_str!("./lua/push.lua")),
            lease: Script::new(include_str!("./lua/lease.lua")),
            ack: Script::new(include_str!("./lua/ack.lua")),
            nack: Script::new(include_str!("./lua/nack.lua")),
        }
    }
}

impl Default for LuaScripts {
    fn default() -> Self {
        Self::new()
    }
}
